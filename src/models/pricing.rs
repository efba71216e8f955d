//! Black-Scholes parameter sets and pricing-surface payloads
//!
//! The UI works in whole percentages (0-100) while the price service expects
//! fractions (0-1). Every conversion between the two goes through
//! [`pct_to_fraction`] and [`fraction_to_pct`].

use crate::config::SurfaceDefaults;
use crate::error::{OptionsError, Result};
use crate::models::OptionType;
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub const PERCENT_SCALE: f64 = 100.0;

pub fn pct_to_fraction(pct: f64) -> f64 {
    pct / PERCENT_SCALE
}

pub fn fraction_to_pct(fraction: f64) -> f64 {
    fraction * PERCENT_SCALE
}

/// Editable pricing inputs, percentages as whole numbers
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BsInputs {
    pub spot: f64,
    pub strike: f64,
    /// Calendar days to expiration
    pub days: u32,
    pub volatility_pct: f64,
    pub rate_pct: f64,
    pub dividend_yield_pct: f64,
}

/// Fields adjustable with the +/- step buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Spot,
    Volatility,
    Rate,
    DividendYield,
}

impl BsInputs {
    /// Rejects values the service's request model refuses.
    pub fn validate(&self) -> Result<()> {
        if !(self.spot > 0.0) {
            return Err(OptionsError::InvalidInput(format!(
                "spot must be positive, got {}",
                self.spot
            )));
        }
        if !(self.strike > 0.0) {
            return Err(OptionsError::InvalidInput(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if !(self.volatility_pct > 0.0) {
            return Err(OptionsError::InvalidInput(format!(
                "volatility must be positive, got {}%",
                self.volatility_pct
            )));
        }
        if self.rate_pct < 0.0 || self.dividend_yield_pct < 0.0 {
            return Err(OptionsError::InvalidInput(
                "rate and dividend yield must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get(&self, field: InputField) -> f64 {
        match field {
            InputField::Spot => self.spot,
            InputField::Volatility => self.volatility_pct,
            InputField::Rate => self.rate_pct,
            InputField::DividendYield => self.dividend_yield_pct,
        }
    }

    pub fn set(&mut self, field: InputField, value: f64) {
        let slot = match field {
            InputField::Spot => &mut self.spot,
            InputField::Volatility => &mut self.volatility_pct,
            InputField::Rate => &mut self.rate_pct,
            InputField::DividendYield => &mut self.dividend_yield_pct,
        };
        *slot = value;
    }

    /// Step a field by `delta`, clamped at zero and rounded to cents
    pub fn bump(&mut self, field: InputField, delta: f64) {
        let current = self.get(field);
        let current = if current.is_finite() { current } else { 0.0 };
        let next = (current + delta).max(0.0);
        self.set(field, (next * 100.0).round() / 100.0);
    }

    pub fn to_calculate_request(&self, expiration: NaiveDate) -> CalculateRequest {
        CalculateRequest {
            spot: self.spot,
            strike: self.strike,
            expiration,
            rate: pct_to_fraction(self.rate_pct),
            volatility: pct_to_fraction(self.volatility_pct),
            dividend_yield: pct_to_fraction(self.dividend_yield_pct),
        }
    }
}

/// Body of `POST /calculate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub spot: f64,
    pub strike: f64,
    #[serde(with = "iso_date")]
    pub expiration: NaiveDate,
    pub rate: f64,
    pub volatility: f64,
    pub dividend_yield: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta_call: f64,
    pub delta_put: f64,
    pub gamma: f64,
    pub theta_call: f64,
    pub theta_put: f64,
    pub vega: f64,
    pub rho_call: f64,
    pub rho_put: f64,
}

/// Response of `POST /calculate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub call_price: f64,
    pub put_price: f64,
    #[serde(default)]
    pub greeks: Option<Greeks>,
}

/// Body of `POST /heatmap`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub strike: f64,
    #[serde(with = "iso_date")]
    pub expiration: NaiveDate,
    pub rate: f64,
    pub dividend_yield: f64,
    pub spot_min: f64,
    pub spot_max: f64,
    pub spot_steps: u32,
    pub vol_min: f64,
    pub vol_max: f64,
    pub vol_steps: u32,
}

/// Editable spot and volatility bounds of a surface, volatility in whole
/// percentages.
///
/// Setters keep `spot_min <= spot_max` and floor volatility at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRange {
    pub spot_min: f64,
    pub spot_max: f64,
    pub vol_min_pct: f64,
    pub vol_max_pct: f64,
}

impl SurfaceRange {
    pub fn new(spot_min: f64, spot_max: f64, vol_min_pct: f64, vol_max_pct: f64) -> Self {
        Self {
            spot_min: spot_min.min(spot_max),
            spot_max,
            vol_min_pct: vol_min_pct.max(0.0),
            vol_max_pct: vol_max_pct.max(0.0),
        }
    }

    /// Spot and volatility each spread symmetrically around the inputs
    pub fn around(inputs: &BsInputs, spread: &SurfaceDefaults) -> Self {
        Self::new(
            inputs.spot * (1.0 - spread.spot_spread),
            inputs.spot * (1.0 + spread.spot_spread),
            inputs.volatility_pct * (1.0 - spread.vol_spread),
            inputs.volatility_pct * (1.0 + spread.vol_spread),
        )
    }

    /// Lower spot bound, never above the upper one
    pub fn set_spot_min(&mut self, value: f64) {
        self.spot_min = value.min(self.spot_max);
    }

    /// Upper spot bound, never below the lower one
    pub fn set_spot_max(&mut self, value: f64) {
        self.spot_max = value.max(self.spot_min);
    }

    pub fn set_vol_min_pct(&mut self, value: f64) {
        self.vol_min_pct = value.max(0.0);
    }

    pub fn set_vol_max_pct(&mut self, value: f64) {
        self.vol_max_pct = value.max(0.0);
    }
}

impl HeatmapRequest {
    /// Grid centered on the current inputs: spot and volatility each spread
    /// symmetrically by the configured fractions.
    pub fn around(inputs: &BsInputs, expiration: NaiveDate, range: &SurfaceDefaults) -> Result<Self> {
        Self::within(inputs, expiration, &SurfaceRange::around(inputs, range), range.steps)
    }

    /// Grid over explicit bounds, `steps` points on each axis
    pub fn within(
        inputs: &BsInputs,
        expiration: NaiveDate,
        range: &SurfaceRange,
        steps: u32,
    ) -> Result<Self> {
        if !(inputs.strike > 0.0) {
            return Err(OptionsError::InvalidInput(
                "a strike is required before requesting a surface".to_string(),
            ));
        }
        if !(range.spot_min > 0.0) || !(range.spot_max >= range.spot_min) {
            return Err(OptionsError::InvalidInput(format!(
                "spot range {:.2}..{:.2} must be positive and ascending",
                range.spot_min, range.spot_max
            )));
        }
        if steps < 2 {
            return Err(OptionsError::InvalidInput(format!(
                "a surface needs at least 2 steps per axis, got {}",
                steps
            )));
        }
        Ok(Self {
            strike: inputs.strike,
            expiration,
            rate: pct_to_fraction(inputs.rate_pct),
            dividend_yield: pct_to_fraction(inputs.dividend_yield_pct),
            spot_min: range.spot_min,
            spot_max: range.spot_max,
            spot_steps: steps,
            vol_min: pct_to_fraction(range.vol_min_pct.max(0.0)),
            vol_max: pct_to_fraction(range.vol_max_pct.max(0.0)),
            vol_steps: steps,
        })
    }
}

/// Wire shape of the `/heatmap` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapResponse {
    pub spots: Vec<f64>,
    pub vols: Vec<f64>,
    pub call_prices: Vec<Vec<f64>>,
    pub put_prices: Vec<Vec<f64>>,
}

/// Theoretical call and put values over a spot x volatility grid.
///
/// Matrices are indexed `[vol_index, spot_index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingSurface {
    pub spots: Vec<f64>,
    pub vols: Vec<f64>,
    pub call_prices: Array2<f64>,
    pub put_prices: Array2<f64>,
}

fn to_matrix(name: &str, rows: Vec<Vec<f64>>, n_vols: usize, n_spots: usize) -> Result<Array2<f64>> {
    if rows.len() != n_vols {
        return Err(OptionsError::ParseError(format!(
            "{} has {} rows, expected one per volatility ({})",
            name,
            rows.len(),
            n_vols
        )));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_spots) {
        return Err(OptionsError::ParseError(format!(
            "{} row {} has {} columns, expected one per spot ({})",
            name,
            i,
            row.len(),
            n_spots
        )));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_vols, n_spots), flat)
        .map_err(|e| OptionsError::ParseError(format!("{} has an invalid shape: {}", name, e)))
}

impl TryFrom<HeatmapResponse> for PricingSurface {
    type Error = OptionsError;

    fn try_from(resp: HeatmapResponse) -> Result<Self> {
        let (n_vols, n_spots) = (resp.vols.len(), resp.spots.len());
        let call_prices = to_matrix("call_prices", resp.call_prices, n_vols, n_spots)?;
        let put_prices = to_matrix("put_prices", resp.put_prices, n_vols, n_spots)?;
        Ok(Self {
            spots: resp.spots,
            vols: resp.vols,
            call_prices,
            put_prices,
        })
    }
}

impl PricingSurface {
    pub fn shape(&self) -> (usize, usize) {
        (self.vols.len(), self.spots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.vols.is_empty() || self.spots.is_empty()
    }

    pub fn prices(&self, side: OptionType) -> &Array2<f64> {
        match side {
            OptionType::Call => &self.call_prices,
            OptionType::Put => &self.put_prices,
        }
    }
}

/// `YYYY-MM-DD` on the wire, read component by component.
pub(crate) mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}
