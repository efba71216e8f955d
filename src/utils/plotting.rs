use crate::config::Theme;
use crate::error::{OptionsError, Result};
use crate::models::{OptionType, PricingSurface};
use crate::utils::surface::SurfaceScale;
use image::ImageFormat;
use ndarray::Array2;
use plotters::backend::BitMapBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 640;
const BAR_AREA: u32 = 110;

fn render_err<E: std::fmt::Display>(e: E) -> OptionsError {
    OptionsError::RenderError(e.to_string())
}

fn palette(theme: Theme) -> (RGBColor, RGBColor) {
    match theme {
        Theme::Light => (WHITE, BLACK),
        Theme::Dark => (RGBColor(18, 18, 18), RGBColor(230, 230, 230)),
    }
}

/// Half the distance between neighbouring axis points, used as cell half-width
fn half_step(axis: &[f64]) -> f64 {
    if axis.len() < 2 {
        return 0.5;
    }
    let span = axis[axis.len() - 1] - axis[0];
    (span / (axis.len() - 1) as f64 / 2.0).abs().max(f64::EPSILON)
}

fn axis_bounds(axis: &[f64], half: f64) -> (f64, f64) {
    let lo = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo - half, hi + half)
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    surface: &PricingSurface,
    prices: &Array2<f64>,
    scale: &SurfaceScale,
    caption: &str,
    fg: RGBColor,
) -> Result<()> {
    let vols_pct: Vec<f64> = surface.vols.iter().map(|v| v * 100.0).collect();
    let spot_half = half_step(&surface.spots);
    let vol_half = half_step(&vols_pct);
    let (spot_lo, spot_hi) = axis_bounds(&surface.spots, spot_half);
    let (vol_lo, vol_hi) = axis_bounds(&vols_pct, vol_half);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 24).into_font().color(&fg))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(spot_lo..spot_hi, vol_lo..vol_hi)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Spot")
        .y_desc("Volatility (%)")
        .x_label_formatter(&|v| format!("${:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}%", v))
        .axis_desc_style(("sans-serif", 15).into_font().color(&fg))
        .label_style(("sans-serif", 12).into_font().color(&fg))
        .axis_style(fg.stroke_width(1))
        .draw()
        .map_err(render_err)?;

    let cells = vols_pct.iter().enumerate().flat_map(|(i, &vol)| {
        surface.spots.iter().enumerate().map(move |(j, &spot)| (i, j, spot, vol))
    });

    chart
        .draw_series(cells.map(|(i, j, spot, vol)| {
            let color = scale.color_of(prices[[i, j]]);
            Rectangle::new(
                [
                    (spot - spot_half, vol - vol_half),
                    (spot + spot_half, vol + vol_half),
                ],
                color.filled(),
            )
        }))
        .map_err(render_err)?;

    Ok(())
}

fn draw_color_bar(
    area: &DrawingArea<BitMapBackend, Shift>,
    scale: &SurfaceScale,
    fg: RGBColor,
) -> Result<()> {
    let bar_width = 20;
    let bar_height = (HEIGHT as i32) - 160;
    let bar_x = 15;
    let bar_y = 80;
    let label_style = TextStyle::from(("sans-serif", 12)).color(&fg);

    for i in 0..bar_height {
        let fraction = 1.0 - (i as f64 / bar_height as f64);
        let (r, g, b) = scale.gradient.rgb(fraction);
        area.draw(&Rectangle::new(
            [(bar_x, bar_y + i), (bar_x + bar_width, bar_y + i + 1)],
            RGBColor(r, g, b).filled(),
        ))
        .map_err(render_err)?;
    }

    area.draw_text(
        &format!("${:.2}", scale.max),
        &label_style,
        (bar_x + bar_width + 5, bar_y),
    )
    .map_err(render_err)?;
    area.draw_text(
        &format!("${:.2}", scale.min),
        &label_style,
        (bar_x + bar_width + 5, bar_y + bar_height - 12),
    )
    .map_err(render_err)?;

    Ok(())
}

/// Render call and put surfaces side by side against one shared scale.
///
/// Returns packed RGB pixels of `WIDTH x HEIGHT`.
pub fn render_heatmaps_in_memory(
    surface: &PricingSurface,
    scale: &SurfaceScale,
    title: &str,
    theme: Theme,
) -> Result<(Vec<u8>, u32, u32)> {
    if surface.is_empty() {
        return Err(OptionsError::RenderError(
            "No data points for pricing surface".to_string(),
        ));
    }

    let (bg, fg) = palette(theme);
    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&bg).map_err(render_err)?;

        let root = root
            .titled(title, ("sans-serif", 28).into_font().color(&fg))
            .map_err(render_err)?;
        let (panels, bar) = root.split_horizontally((WIDTH - BAR_AREA) as i32);
        let (call_area, put_area) = panels.split_horizontally(((WIDTH - BAR_AREA) / 2) as i32);

        for (area, side) in [(&call_area, OptionType::Call), (&put_area, OptionType::Put)] {
            let caption = format!("{} Price Heatmap", side);
            draw_panel(area, surface, surface.prices(side), scale, &caption, fg)?;
        }
        draw_color_bar(&bar, scale, fg)?;

        root.present().map_err(render_err)?;
    }

    Ok((buffer, WIDTH, HEIGHT))
}

pub fn render_heatmaps<P: AsRef<Path>>(
    surface: &PricingSurface,
    scale: &SurfaceScale,
    title: &str,
    theme: Theme,
    output_path: P,
) -> Result<()> {
    let (pixels, width, height) = render_heatmaps_in_memory(surface, scale, title, theme)?;
    image::save_buffer_with_format(
        output_path.as_ref(),
        &pixels,
        width,
        height,
        image::ColorType::Rgb8,
        ImageFormat::Png,
    )?;
    Ok(())
}
