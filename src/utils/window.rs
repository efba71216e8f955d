//! Strike-centered windows over an option chain

use crate::models::{OptionChain, OptionContract, OptionType};
use std::cmp::Ordering;

pub const DEFAULT_WINDOW_SIZE: usize = 9;

/// A bounded, strike-ascending slice of one side of a chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainWindow {
    pub side: OptionType,
    pub contracts: Vec<OptionContract>,
    /// Index within `contracts` of the first strike at or above the reference spot
    pub center: Option<usize>,
}

impl ChainWindow {
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn contains(&self, contract_id: &str) -> bool {
        self.find(contract_id).is_some()
    }

    pub fn find(&self, contract_id: &str) -> Option<&OptionContract> {
        self.contracts.iter().find(|c| c.contract_id == contract_id)
    }

    pub fn center_contract(&self) -> Option<&OptionContract> {
        self.center.and_then(|i| self.contracts.get(i))
    }

    pub fn strikes(&self) -> Vec<f64> {
        self.contracts.iter().map(|c| c.strike).collect()
    }
}

/// Picks the visible window of a chain around the reference spot.
///
/// Contracts are ordered by ascending strike; the center is the first strike
/// `>=` the spot, or the middle of the chain when every strike is below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainWindower {
    size: usize,
}

impl Default for ChainWindower {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ChainWindower {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Window the requested side of an already-fetched chain
    pub fn window(
        &self,
        chain: &OptionChain,
        reference_spot: Option<f64>,
        side: OptionType,
    ) -> ChainWindow {
        let (contracts, center) = window_contracts(chain.side(side), reference_spot, self.size);
        ChainWindow {
            side,
            contracts,
            center,
        }
    }
}

fn by_strike(a: &OptionContract, b: &OptionContract) -> Ordering {
    // NaN strikes sink to the end
    match (a.strike.is_nan(), b.strike.is_nan()) {
        (false, false) => a.strike.partial_cmp(&b.strike).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// Core windowing over a flat contract list.
///
/// Returns the window plus the center's position inside it. Without a
/// reference spot the midpoint is used as the center.
pub fn window_contracts(
    contracts: &[OptionContract],
    reference_spot: Option<f64>,
    size: usize,
) -> (Vec<OptionContract>, Option<usize>) {
    if contracts.is_empty() || size == 0 {
        return (Vec::new(), None);
    }

    let mut sorted = contracts.to_vec();
    sorted.sort_by(by_strike);

    let len = sorted.len();
    let center = reference_spot
        .and_then(|spot| sorted.iter().position(|c| c.strike >= spot))
        .unwrap_or(len / 2);

    let half = (size - 1) / 2;
    // clamp at the top so a long enough chain always fills the window
    let start = center.saturating_sub(half).min(len.saturating_sub(size));
    let end = (start + size).min(len);

    let window = sorted[start..end].to_vec();
    let center_in_window = (center >= start && center < end).then(|| center - start);
    (window, center_in_window)
}
