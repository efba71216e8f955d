use crate::error::Result;
use crate::models::{
    CalculateRequest, CalculationResult, HeatmapRequest, OptionChain, PricingSurface,
    SearchResult, SpotQuote,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// The external price service.
///
/// Every method maps to one endpoint; implementations do no caching of their
/// own, that is the coordinator's job.
#[async_trait]
pub trait PriceService: Send + Sync {
    /// `GET /spot`
    async fn spot(&self, ticker: &str) -> Result<SpotQuote>;

    /// `GET /expirations`, ascending
    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>>;

    /// `GET /option_chain`, both sides
    async fn option_chain(&self, ticker: &str, expiration: NaiveDate) -> Result<OptionChain>;

    /// `POST /calculate`
    async fn calculate(&self, request: &CalculateRequest) -> Result<CalculationResult>;

    /// `POST /heatmap`
    async fn heatmap(&self, request: &HeatmapRequest) -> Result<PricingSurface>;

    /// `GET /search`; implementations return an empty list rather than fail
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}
