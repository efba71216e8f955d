use crate::api::PriceService;
use crate::config::ServiceConfig;
use crate::error::{OptionsError, Result};
use crate::models::{
    CalculateRequest, CalculationResult, ErrorDetail, ExpirationsResponse, HeatmapRequest,
    HeatmapResponse, OptionChain, PricingSurface, SearchResult, SpotQuote,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

static JSON_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut h = HeaderMap::new();
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h
});

/// HTTP client for the price service
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    config: ServiceConfig,
}

/// Turn a non-2xx response body into an error, preferring the service's
/// own `detail` message.
pub(crate) fn error_from_status(status: StatusCode, body: &str) -> OptionsError {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(err) if !err.detail.trim().is_empty() => OptionsError::NotFound(err.detail),
        _ => OptionsError::NotFound(format!("Request failed with status {}", status)),
    }
}

impl RestClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        // a trailing slash keeps `join` from dropping the last path segment
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            OptionsError::ConfigError(format!("Invalid price service URL '{}': {}", base, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(JSON_HEADERS.clone())
            .build()
            .map_err(|e| OptionsError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| OptionsError::ConfigError(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| OptionsError::Network(format!("Failed to read {} response: {}", what, e)))?;

        if !status.is_success() {
            warn!("{} request failed with status {}", what, status);
            return Err(error_from_status(status, &body));
        }

        debug!(
            "{} response (first 200 chars): {}",
            what,
            body.chars().take(200).collect::<String>()
        );

        serde_json::from_str::<T>(&body)
            .map_err(|e| OptionsError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)], what: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| OptionsError::Network(format!("Failed to get {}: {}", what, e)))?;
        Self::read_json(resp, what).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| OptionsError::Network(format!("Failed to post {}: {}", what, e)))?;
        Self::read_json(resp, what).await
    }
}

#[async_trait]
impl PriceService for RestClient {
    async fn spot(&self, ticker: &str) -> Result<SpotQuote> {
        debug!("Getting spot for {}", ticker);
        self.get("spot", &[("ticker", ticker)], "spot").await
    }

    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        debug!("Getting expirations for {}", ticker);
        let resp: ExpirationsResponse = self
            .get("expirations", &[("ticker", ticker)], "expirations")
            .await?;
        let dates = resp.dates();
        if dates.len() != resp.expirations.len() {
            warn!(
                "Dropped {} malformed expiration dates for {}",
                resp.expirations.len() - dates.len(),
                ticker
            );
        }
        Ok(dates)
    }

    async fn option_chain(&self, ticker: &str, expiration: NaiveDate) -> Result<OptionChain> {
        let exp = expiration.format("%Y-%m-%d").to_string();
        info!("Getting option chain for {} exp {}", ticker, exp);
        let chain: OptionChain = self
            .get(
                "option_chain",
                &[("ticker", ticker), ("expiration", exp.as_str())],
                "option chain",
            )
            .await?;
        info!(
            "Option chain parsed. Got {} calls and {} puts",
            chain.calls.len(),
            chain.puts.len()
        );
        Ok(chain)
    }

    async fn calculate(&self, request: &CalculateRequest) -> Result<CalculationResult> {
        debug!("Calculating prices: {:?}", request);
        self.post("calculate", request, "calculation").await
    }

    async fn heatmap(&self, request: &HeatmapRequest) -> Result<PricingSurface> {
        debug!("Requesting pricing surface: {:?}", request);
        let resp: HeatmapResponse = self.post("heatmap", request, "heatmap").await?;
        PricingSurface::try_from(resp)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        match self.get("search", &[("q", query)], "search").await {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                Ok(Vec::new())
            }
        }
    }
}
