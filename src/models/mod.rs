//! Data models for option chains and pricing requests
//!
//! This module contains the contract and chain types returned by the price
//! service, the Black-Scholes input set, and the pricing-surface payloads.

mod option;
pub mod pricing;
mod quote;

pub use option::*;
pub use pricing::{
    BsInputs, CalculateRequest, CalculationResult, Greeks, HeatmapRequest, HeatmapResponse,
    InputField, PricingSurface, SurfaceRange,
};
pub use quote::*;
