use crate::api::PriceService;
use crate::error::{OptionsError, Result};
use crate::models::{
    CalculateRequest, CalculationResult, HeatmapRequest, OptionChain, PricingSurface,
    SearchResult, SpotQuote,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Which endpoint a recorded call hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Spot,
    Expirations,
    OptionChain,
    Calculate,
    Heatmap,
    Search,
}

/// Test fake serving canned responses per ticker.
///
/// Records every call so tests can count round trips. Only compiled for
/// unit tests.
#[derive(Default)]
pub struct InMemoryPriceService {
    spots: HashMap<String, SpotQuote>,
    expirations: HashMap<String, Vec<NaiveDate>>,
    chains: HashMap<(String, NaiveDate), OptionChain>,
    calculation: Option<CalculationResult>,
    surface: Option<PricingSurface>,
    unreachable: HashSet<(String, Endpoint)>,
    calls: Mutex<Vec<(Endpoint, String)>>,
}

fn not_found(ticker: &str) -> OptionsError {
    OptionsError::NotFound(format!("Ticker {} not found or no price data", ticker))
}

impl InMemoryPriceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spot(mut self, ticker: &str, spot: f64) -> Self {
        self.spots
            .insert(ticker.to_string(), SpotQuote::new(ticker, spot));
        self
    }

    pub fn with_expirations(mut self, ticker: &str, dates: Vec<NaiveDate>) -> Self {
        self.expirations.insert(ticker.to_string(), dates);
        self
    }

    pub fn with_chain(mut self, ticker: &str, expiration: NaiveDate, chain: OptionChain) -> Self {
        self.chains.insert((ticker.to_string(), expiration), chain);
        self
    }

    pub fn with_calculation(mut self, result: CalculationResult) -> Self {
        self.calculation = Some(result);
        self
    }

    pub fn with_surface(mut self, surface: PricingSurface) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Make one endpoint fail with a network error for `ticker`
    pub fn unreachable(mut self, ticker: &str, endpoint: Endpoint) -> Self {
        self.unreachable.insert((ticker.to_string(), endpoint));
        self
    }

    /// Number of calls made to `endpoint`
    pub fn calls_to(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|(e, _)| *e == endpoint).count())
            .unwrap_or(0)
    }

    fn record(&self, endpoint: Endpoint, key: &str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint, key.to_string()));
        }
        if self.unreachable.contains(&(key.to_string(), endpoint)) {
            return Err(OptionsError::Network(format!(
                "{:?} unreachable for {}",
                endpoint, key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceService for InMemoryPriceService {
    async fn spot(&self, ticker: &str) -> Result<SpotQuote> {
        self.record(Endpoint::Spot, ticker)?;
        self.spots.get(ticker).cloned().ok_or_else(|| not_found(ticker))
    }

    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        self.record(Endpoint::Expirations, ticker)?;
        self.expirations
            .get(ticker)
            .cloned()
            .ok_or_else(|| not_found(ticker))
    }

    async fn option_chain(&self, ticker: &str, expiration: NaiveDate) -> Result<OptionChain> {
        self.record(Endpoint::OptionChain, ticker)?;
        self.chains
            .get(&(ticker.to_string(), expiration))
            .cloned()
            .ok_or_else(|| {
                OptionsError::NotFound(format!(
                    "Invalid expiration date: {}. Please choose from available expirations.",
                    expiration.format("%Y-%m-%d")
                ))
            })
    }

    async fn calculate(&self, _request: &CalculateRequest) -> Result<CalculationResult> {
        self.record(Endpoint::Calculate, "")?;
        self.calculation
            .clone()
            .ok_or_else(|| OptionsError::NotFound("No calculation configured".to_string()))
    }

    async fn heatmap(&self, _request: &HeatmapRequest) -> Result<PricingSurface> {
        self.record(Endpoint::Heatmap, "")?;
        self.surface
            .clone()
            .ok_or_else(|| OptionsError::NotFound("No surface configured".to_string()))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.record(Endpoint::Search, query)?;
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<SearchResult> = self
            .spots
            .values()
            .filter(|q| q.symbol.starts_with(&needle))
            .map(|q| SearchResult {
                symbol: q.symbol.clone(),
                name: q.company.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(hits)
    }
}
