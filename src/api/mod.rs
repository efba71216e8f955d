//! Clients for the external price service
//!
//! [`PriceService`] is the seam the selection state machine talks through;
//! [`RestClient`] implements it over HTTP. Unit tests use an in-memory fake.

#[cfg(test)]
mod memory;
mod rest;
mod service;

#[cfg(test)]
pub use memory::{Endpoint, InMemoryPriceService};
pub use rest::RestClient;
pub use service::PriceService;
