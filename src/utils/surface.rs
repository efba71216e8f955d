//! Shared color scale for call and put pricing surfaces

use crate::models::PricingSurface;
use ndarray::Array2;
use plotters::style::{Color, HSLColor, RGBColor};

const SATURATION: f64 = 1.0;
const LIGHTNESS: f64 = 0.5;

/// How a normalized fraction in `[0, 1]` becomes a color
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gradient {
    /// Linear sweep over the HSL hue circle, in degrees
    HueSweep { from_deg: f64, to_deg: f64 },
    /// The viridis palette
    Viridis,
}

impl Default for Gradient {
    /// Blue (240 degrees) to yellow (60 degrees)
    fn default() -> Self {
        Gradient::HueSweep {
            from_deg: 240.0,
            to_deg: 60.0,
        }
    }
}

impl Gradient {
    /// Hue in degrees for a fraction, `None` for palettes
    pub fn hue(&self, fraction: f64) -> Option<f64> {
        match *self {
            Gradient::HueSweep { from_deg, to_deg } => Some(from_deg + (to_deg - from_deg) * fraction),
            Gradient::Viridis => None,
        }
    }

    pub fn rgb(&self, fraction: f64) -> (u8, u8, u8) {
        match self.hue(fraction) {
            Some(hue) => HSLColor(hue.rem_euclid(360.0) / 360.0, SATURATION, LIGHTNESS).rgb(),
            None => {
                let c = colorous::VIRIDIS.eval_continuous(fraction);
                (c.r, c.g, c.b)
            }
        }
    }

    /// CSS color string for a fraction
    pub fn css(&self, fraction: f64) -> String {
        match self.hue(fraction) {
            Some(hue) => format!(
                "hsl({:.1}, {:.0}%, {:.0}%)",
                hue,
                SATURATION * 100.0,
                LIGHTNESS * 100.0
            ),
            None => {
                let (r, g, b) = self.rgb(fraction);
                format!("rgb({}, {}, {})", r, g, b)
            }
        }
    }
}

/// Value range shared by every matrix it was computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceScale {
    pub min: f64,
    pub max: f64,
    pub gradient: Gradient,
}

impl SurfaceScale {
    /// Position of `value` on the gradient, always within `[0, 1]`.
    ///
    /// A flat range and non-finite values map to 0.
    pub fn fraction(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !value.is_finite() || !(span > 0.0) {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color_of(&self, value: f64) -> RGBColor {
        let (r, g, b) = self.gradient.rgb(self.fraction(value));
        RGBColor(r, g, b)
    }

    pub fn hue_of(&self, value: f64) -> Option<f64> {
        self.gradient.hue(self.fraction(value))
    }

    pub fn css_of(&self, value: f64) -> String {
        self.gradient.css(self.fraction(value))
    }
}

/// Computes one [`SurfaceScale`] across the call and put matrices so both
/// heatmaps are read against the same colors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceNormalizer {
    pub gradient: Gradient,
}

impl SurfaceNormalizer {
    pub fn new(gradient: Gradient) -> Self {
        Self { gradient }
    }

    pub fn normalize(&self, matrix: &Array2<f64>, matrix2: Option<&Array2<f64>>) -> SurfaceScale {
        let cells = matrix.iter().chain(matrix2.into_iter().flat_map(|m| m.iter()));
        self.scale_over(cells.copied())
    }

    /// Same as [`normalize`](Self::normalize) over raw nested rows
    pub fn normalize_rows(&self, rows: &[Vec<f64>], rows2: Option<&[Vec<f64>]>) -> SurfaceScale {
        let cells = rows
            .iter()
            .flatten()
            .chain(rows2.into_iter().flat_map(|r| r.iter().flatten()));
        self.scale_over(cells.copied())
    }

    pub fn normalize_surface(&self, surface: &PricingSurface) -> SurfaceScale {
        self.normalize(&surface.call_prices, Some(&surface.put_prices))
    }

    fn scale_over<I: Iterator<Item = f64>>(&self, cells: I) -> SurfaceScale {
        let (min, max) = cells
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let (min, max) = if min <= max { (min, max) } else { (0.0, 0.0) };
        SurfaceScale {
            min,
            max,
            gradient: self.gradient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn range_spans_both_matrices() {
        let calls = array![[1.20, 10.0], [25.5, 48.75]];
        let puts = array![[12.10, 3.3], [0.05, 7.0]];
        let scale = SurfaceNormalizer::default().normalize(&calls, Some(&puts));
        assert_eq!(scale.min, 0.05);
        assert_eq!(scale.max, 48.75);
        assert_eq!(scale.fraction(48.75), 1.0);
        assert_eq!(scale.hue_of(48.75), Some(60.0));
        assert_eq!(scale.fraction(0.05), 0.0);
        assert_eq!(scale.hue_of(0.05), Some(240.0));
    }

    #[test]
    fn normalize_is_idempotent() {
        let calls = array![[2.0, 4.0], [6.0, 8.0]];
        let normalizer = SurfaceNormalizer::default();
        let a = normalizer.normalize(&calls, None);
        let b = normalizer.normalize(&calls, None);
        assert_eq!(a, b);
        for v in calls.iter() {
            assert_eq!(a.gradient.rgb(a.fraction(*v)), b.gradient.rgb(b.fraction(*v)));
        }
    }

    #[test]
    fn flat_surface_has_defined_colors() {
        let flat = array![[3.0, 3.0], [3.0, 3.0]];
        let scale = SurfaceNormalizer::default().normalize(&flat, Some(&flat));
        assert_eq!((scale.min, scale.max), (3.0, 3.0));
        for v in flat.iter() {
            let f = scale.fraction(*v);
            assert!(!f.is_nan());
            assert_eq!(f, 0.0);
            assert_eq!(scale.hue_of(*v), Some(240.0));
        }
    }

    #[test]
    fn out_of_range_and_nan_values_are_clamped() {
        let m = array![[0.0, 10.0]];
        let scale = SurfaceNormalizer::default().normalize(&m, None);
        assert_eq!(scale.fraction(-5.0), 0.0);
        assert_eq!(scale.fraction(50.0), 1.0);
        assert_eq!(scale.fraction(f64::NAN), 0.0);
        assert_eq!(scale.fraction(5.0), 0.5);
        assert_eq!(scale.hue_of(5.0), Some(150.0));
    }

    #[test]
    fn nan_cells_are_ignored_when_ranging() {
        let m = array![[f64::NAN, 2.0], [4.0, f64::INFINITY]];
        let scale = SurfaceNormalizer::default().normalize(&m, None);
        assert_eq!((scale.min, scale.max), (2.0, 4.0));
    }

    #[test]
    fn empty_matrices_give_a_zero_range() {
        let scale = SurfaceNormalizer::default().normalize_rows(&[], None);
        assert_eq!((scale.min, scale.max), (0.0, 0.0));
        assert_eq!(scale.fraction(1.0), 0.0);
    }

    #[test]
    fn rows_and_arrays_agree() {
        let rows = vec![vec![1.0, 5.0], vec![9.0, 2.0]];
        let puts = vec![vec![0.5, 1.0], vec![3.0, 4.0]];
        let normalizer = SurfaceNormalizer::default();
        let from_rows = normalizer.normalize_rows(&rows, Some(puts.as_slice()));
        let from_arrays = normalizer.normalize(
            &array![[1.0, 5.0], [9.0, 2.0]],
            Some(&array![[0.5, 1.0], [3.0, 4.0]]),
        );
        assert_eq!(from_rows, from_arrays);
    }

    #[test]
    fn hue_sweep_endpoints_are_blue_and_yellow() {
        let g = Gradient::default();
        let (r, g_, b) = g.rgb(0.0);
        assert!(r < 5 && g_ < 5 && b > 250, "not blue: {:?}", (r, g_, b));
        let (r, g_, b) = g.rgb(1.0);
        assert!(r > 250 && g_ > 250 && b < 5, "not yellow: {:?}", (r, g_, b));
        assert_eq!(g.css(0.0), "hsl(240.0, 100%, 50%)");
    }

    #[test]
    fn viridis_palette_has_no_hue() {
        let scale = SurfaceNormalizer::new(Gradient::Viridis).normalize(&array![[0.0, 1.0]], None);
        assert_eq!(scale.hue_of(1.0), None);
        assert!(scale.css_of(0.5).starts_with("rgb("));
    }
}
