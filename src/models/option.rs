use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::OptionsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

impl OptionType {
    pub fn flipped(self) -> Self {
        match self {
            OptionType::Call => OptionType::Put,
            OptionType::Put => OptionType::Call,
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(OptionsError::ParseError(format!(
                "Unknown option side: {}",
                other
            ))),
        }
    }
}

// The service replaces NaN quotes with null.
fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// One listed contract as returned by the chain endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    /// OCC-style identifier, unique within a chain
    #[serde(rename = "contractSymbol")]
    pub contract_id: String,
    pub strike: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub bid: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub ask: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub last_price: f64,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub in_the_money: bool,
}

impl OptionContract {
    pub fn new(contract_id: impl Into<String>, strike: f64) -> Self {
        Self {
            contract_id: contract_id.into(),
            strike,
            bid: 0.0,
            ask: 0.0,
            last_price: 0.0,
            in_the_money: false,
        }
    }

    pub fn mid_price(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Both sides of the chain for one (ticker, expiration)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    #[serde(default)]
    pub calls: Vec<OptionContract>,
    #[serde(default)]
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn side(&self, side: OptionType) -> &[OptionContract] {
        match side {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}
