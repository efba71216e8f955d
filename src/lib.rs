//! # options-chain
//!
//! Client-side logic for browsing a priced option chain and visualizing
//! Black-Scholes pricing surfaces served by an external price service.
//!
//! ## Features
//!
//! - Async REST client for the price service behind a `PriceService` trait
//! - Strike-centered chain windows that follow the spot price
//! - Local-calendar day counts to expiration
//! - A selection state machine that drops responses for abandoned selections
//! - Call and put heatmaps rendered against one shared color scale
//! - Environment-based configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use options_chain::api::RestClient;
//! use options_chain::config::Config;
//! use options_chain::session::{SelectionCoordinator, Session};
//! use options_chain::utils::{ChainWindower, DayCounter};
//!
//! #[tokio::main]
//! async fn main() -> options_chain::error::Result<()> {
//!     let config = Config::from_env()?;
//!     config.init_logging()?;
//!
//!     let client = RestClient::new(config.service.clone())?;
//!     let coordinator = SelectionCoordinator::new(
//!         ChainWindower::new(config.window_size),
//!         DayCounter::local(),
//!     );
//!     let mut session = Session::new(client, coordinator);
//!
//!     let state = session.set_symbol("AAPL").await;
//!     for contract in &state.window.contracts {
//!         println!("{:>8.2}  bid {:.2}  ask {:.2}", contract.strike, contract.bid, contract.ask);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use api::{PriceService, RestClient};
pub use config::Config;
pub use error::{OptionsError, Result};
pub use session::{SelectionCoordinator, Session};
