use crate::api::PriceService;
use crate::config::SurfaceDefaults;
use crate::error::Result;
use crate::models::{BsInputs, OptionType, SearchResult, SurfaceRange};
use crate::session::coordinator::{Request, Response, SelectionCoordinator, SelectionState, Ticket};
use chrono::NaiveDate;
use futures::future::join_all;
use tracing::debug;

/// Runs the requests a [`SelectionCoordinator`] issues against a
/// [`PriceService`] and feeds the answers back until nothing is left to fetch.
pub struct Session<S: PriceService> {
    service: S,
    coordinator: SelectionCoordinator,
}

/// Perform one request; the ticket travels with the result
pub async fn execute<S: PriceService + ?Sized>(service: &S, request: Request) -> (Ticket, Response) {
    match request {
        Request::Spot { ticket, symbol } => {
            let result = service.spot(&symbol).await;
            (ticket, Response::Spot(result))
        }
        Request::Expirations { ticket, symbol } => {
            let result = service.expirations(&symbol).await;
            (ticket, Response::Expirations(result))
        }
        Request::Chain {
            ticket,
            symbol,
            expiration,
        } => {
            let result = service.option_chain(&symbol, expiration).await;
            (ticket, Response::Chain(result))
        }
        Request::Calculate { ticket, request } => {
            let result = service.calculate(&request).await;
            (ticket, Response::Calculation(result))
        }
        Request::Surface { ticket, request } => {
            let result = service.heatmap(&request).await;
            (ticket, Response::Surface(result))
        }
    }
}

impl<S: PriceService> Session<S> {
    pub fn new(service: S, coordinator: SelectionCoordinator) -> Self {
        Self {
            service,
            coordinator,
        }
    }

    pub fn state(&self) -> &SelectionState {
        self.coordinator.state()
    }

    pub fn coordinator(&self) -> &SelectionCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut SelectionCoordinator {
        &mut self.coordinator
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Run `requests` concurrently without applying the results
    pub async fn fetch(&self, requests: Vec<Request>) -> Vec<(Ticket, Response)> {
        join_all(requests.into_iter().map(|r| execute(&self.service, r))).await
    }

    /// Apply fetched results, returning whatever they trigger next
    pub fn apply_all(&mut self, responses: Vec<(Ticket, Response)>) -> Vec<Request> {
        responses
            .into_iter()
            .flat_map(|(ticket, response)| self.coordinator.apply(&ticket, response))
            .collect()
    }

    /// Fetch and apply until no follow-up requests remain
    pub async fn settle(&mut self, mut requests: Vec<Request>) {
        while !requests.is_empty() {
            debug!("Dispatching {} request(s)", requests.len());
            let responses = self.fetch(requests).await;
            requests = self.apply_all(responses);
        }
    }

    pub async fn set_symbol(&mut self, symbol: &str) -> &SelectionState {
        let requests = self.coordinator.set_symbol(symbol);
        self.settle(requests).await;
        self.state()
    }

    pub async fn set_expiration(&mut self, expiration: NaiveDate) -> Result<&SelectionState> {
        let requests = self.coordinator.set_expiration(expiration)?;
        self.settle(requests).await;
        Ok(self.state())
    }

    pub async fn set_side(&mut self, side: OptionType) -> &SelectionState {
        let requests = self.coordinator.set_side(side);
        self.settle(requests).await;
        self.state()
    }

    pub fn select_contract(&mut self, contract_id: &str) -> Result<&SelectionState> {
        self.coordinator.select_contract(contract_id)?;
        Ok(self.state())
    }

    pub async fn submit_calculation(&mut self, inputs: BsInputs) -> Result<&SelectionState> {
        let request = self.coordinator.submit_calculation(inputs)?;
        self.settle(vec![request]).await;
        Ok(self.state())
    }

    pub async fn request_surface(&mut self, range: Option<SurfaceDefaults>) -> Result<&SelectionState> {
        let request = self.coordinator.request_surface(range)?;
        self.settle(vec![request]).await;
        Ok(self.state())
    }

    pub async fn request_surface_within(&mut self, range: SurfaceRange) -> Result<&SelectionState> {
        let request = self.coordinator.request_surface_within(range)?;
        self.settle(vec![request]).await;
        Ok(self.state())
    }

    /// Ticker autocomplete; never fails
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.service.search(query).await.unwrap_or_default()
    }
}
