//! Selection state machine
//!
//! [`SelectionCoordinator`] owns the browsing state for one ticker at a time.
//! Transitions mutate it synchronously and hand back the [`Request`]s the
//! caller has to run; results come back through [`SelectionCoordinator::apply`]
//! together with the [`Ticket`] they were issued under. A response whose
//! ticket is no longer the latest for its slot, or whose symbol/expiration no
//! longer matches the state, is dropped.

use crate::config::SurfaceDefaults;
use crate::error::{OptionsError, Result};
use crate::models::{
    BsInputs, CalculateRequest, CalculationResult, HeatmapRequest, InputField, OptionChain,
    OptionContract, OptionType, PricingSurface, SpotQuote, SurfaceRange,
};
use crate::utils::{ChainWindow, ChainWindower, DayCounter, SurfaceNormalizer, SurfaceScale};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Independent request lanes; at most one request per slot is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Spot,
    Expirations,
    Chain,
    Calculation,
    Surface,
}

/// Where a failure is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Symbol,
    Expirations,
    Chain,
    Calculation,
    Surface,
}

impl From<Slot> for Field {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Spot => Field::Symbol,
            Slot::Expirations => Field::Expirations,
            Slot::Chain => Field::Chain,
            Slot::Calculation => Field::Calculation,
            Slot::Surface => Field::Surface,
        }
    }
}

/// The selection a request was issued for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub symbol: String,
    pub expiration: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub slot: Slot,
    pub seq: u64,
    pub key: RequestKey,
}

/// Work a transition asks the caller to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Spot {
        ticket: Ticket,
        symbol: String,
    },
    Expirations {
        ticket: Ticket,
        symbol: String,
    },
    Chain {
        ticket: Ticket,
        symbol: String,
        expiration: NaiveDate,
    },
    Calculate {
        ticket: Ticket,
        request: CalculateRequest,
    },
    Surface {
        ticket: Ticket,
        request: HeatmapRequest,
    },
}

impl Request {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Request::Spot { ticket, .. }
            | Request::Expirations { ticket, .. }
            | Request::Chain { ticket, .. }
            | Request::Calculate { ticket, .. }
            | Request::Surface { ticket, .. } => ticket,
        }
    }

    pub fn slot(&self) -> Slot {
        self.ticket().slot
    }
}

/// Outcome of a [`Request`]
#[derive(Debug)]
pub enum Response {
    Spot(Result<SpotQuote>),
    Expirations(Result<Vec<NaiveDate>>),
    Chain(Result<OptionChain>),
    Calculation(Result<CalculationResult>),
    Surface(Result<PricingSurface>),
}

impl Response {
    pub fn slot(&self) -> Slot {
        match self {
            Response::Spot(_) => Slot::Spot,
            Response::Expirations(_) => Slot::Expirations,
            Response::Chain(_) => Slot::Chain,
            Response::Calculation(_) => Slot::Calculation,
            Response::Surface(_) => Slot::Surface,
        }
    }
}

/// Everything a view renders from
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub symbol: String,
    pub spot: Option<SpotQuote>,
    pub expirations: Vec<NaiveDate>,
    /// The expirations response for `symbol` has arrived
    pub expirations_loaded: bool,
    pub expiration: Option<NaiveDate>,
    pub side: OptionType,
    /// Both sides for the current (symbol, expiration)
    pub chain: Option<OptionChain>,
    pub window: ChainWindow,
    pub selected: Option<OptionContract>,
    pub inputs: BsInputs,
    pub calculation: Option<CalculationResult>,
    pub surface: Option<PricingSurface>,
    /// Bounds of the last surface request, for editing
    pub surface_range: Option<SurfaceRange>,
    pub scale: Option<SurfaceScale>,
    pub errors: BTreeMap<Field, String>,
}

impl SelectionState {
    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Expirations were fetched for the symbol and there are none
    pub fn has_no_expirations(&self) -> bool {
        !self.symbol.is_empty()
            && self.expirations_loaded
            && self.expirations.is_empty()
            && !self.errors.contains_key(&Field::Expirations)
    }
}

pub struct SelectionCoordinator {
    state: SelectionState,
    windower: ChainWindower,
    days: DayCounter,
    normalizer: SurfaceNormalizer,
    surface_range: SurfaceDefaults,
    next_seq: u64,
    outstanding: HashMap<Slot, Ticket>,
}

impl SelectionCoordinator {
    pub fn new(windower: ChainWindower, days: DayCounter) -> Self {
        Self {
            state: SelectionState::default(),
            windower,
            days,
            normalizer: SurfaceNormalizer::default(),
            surface_range: SurfaceDefaults::default(),
            next_seq: 0,
            outstanding: HashMap::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: SurfaceNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_surface_range(mut self, range: SurfaceDefaults) -> Self {
        self.surface_range = range;
        self
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn day_counter(&self) -> &DayCounter {
        &self.days
    }

    /// A request for `slot` was issued and has not come back yet
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.outstanding.contains_key(&slot)
    }

    fn current_key(&self, slot: Slot) -> RequestKey {
        let expiration = match slot {
            Slot::Spot | Slot::Expirations => None,
            Slot::Chain | Slot::Calculation | Slot::Surface => self.state.expiration,
        };
        RequestKey {
            symbol: self.state.symbol.clone(),
            expiration,
        }
    }

    fn issue(&mut self, slot: Slot) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            slot,
            seq: self.next_seq,
            key: self.current_key(slot),
        };
        if let Some(previous) = self.outstanding.insert(slot, ticket.clone()) {
            debug!("{:?} request #{} superseded by #{}", slot, previous.seq, ticket.seq);
        }
        ticket
    }

    fn chain_request(&mut self, expiration: NaiveDate) -> Request {
        let ticket = self.issue(Slot::Chain);
        Request::Chain {
            ticket,
            symbol: self.state.symbol.clone(),
            expiration,
        }
    }

    fn clear_pricing(&mut self) {
        self.state.calculation = None;
        self.state.surface = None;
        self.state.surface_range = None;
        self.state.scale = None;
    }

    fn clear_chain(&mut self) {
        self.state.chain = None;
        self.state.window = ChainWindow {
            side: self.state.side,
            ..ChainWindow::default()
        };
        self.state.selected = None;
        self.state.errors.remove(&Field::Chain);
    }

    fn rewindow(&mut self) {
        let spot = self.state.spot.as_ref().map(|q| q.spot);
        self.state.window = match &self.state.chain {
            Some(chain) => self.windower.window(chain, spot, self.state.side),
            None => ChainWindow {
                side: self.state.side,
                ..ChainWindow::default()
            },
        };
        let still_visible = self
            .state
            .selected
            .as_ref()
            .map_or(true, |c| self.state.window.contains(&c.contract_id));
        if !still_visible {
            debug!("Selected contract left the window, clearing selection");
            self.state.selected = None;
        }
    }

    /// Focus a new ticker.
    ///
    /// Everything derived from the previous ticker is dropped. Edited pricing
    /// inputs other than spot, strike and days are kept.
    pub fn set_symbol(&mut self, raw: &str) -> Vec<Request> {
        let symbol = raw.trim().to_uppercase();
        info!("Symbol set to '{}'", symbol);

        self.state.symbol = symbol.clone();
        self.state.spot = None;
        self.state.expirations.clear();
        self.state.expirations_loaded = false;
        self.state.expiration = None;
        self.clear_chain();
        self.clear_pricing();
        self.state.errors.clear();
        self.state.inputs.spot = 0.0;
        self.state.inputs.strike = 0.0;
        self.state.inputs.days = 0;

        if symbol.is_empty() {
            self.outstanding.clear();
            return Vec::new();
        }
        for slot in [Slot::Chain, Slot::Calculation, Slot::Surface] {
            self.outstanding.remove(&slot);
        }

        let spot = self.issue(Slot::Spot);
        let expirations = self.issue(Slot::Expirations);
        vec![
            Request::Spot {
                ticket: spot,
                symbol: symbol.clone(),
            },
            Request::Expirations {
                ticket: expirations,
                symbol,
            },
        ]
    }

    /// Switch to one of the known expirations and fetch its chain
    pub fn set_expiration(&mut self, expiration: NaiveDate) -> Result<Vec<Request>> {
        if !self.state.expirations.contains(&expiration) {
            return Err(OptionsError::InvalidTransition(format!(
                "{} is not an available expiration for '{}'",
                expiration.format("%Y-%m-%d"),
                self.state.symbol
            )));
        }
        info!("Expiration set to {}", expiration);
        self.state.expiration = Some(expiration);
        self.state.inputs.days = self.days.days_until_date(expiration);
        self.clear_chain();
        self.clear_pricing();
        self.state.errors.remove(&Field::Calculation);
        self.state.errors.remove(&Field::Surface);
        for slot in [Slot::Calculation, Slot::Surface] {
            self.outstanding.remove(&slot);
        }
        Ok(vec![self.chain_request(expiration)])
    }

    /// Flip between calls and puts, reusing the fetched chain when present
    pub fn set_side(&mut self, side: OptionType) -> Vec<Request> {
        info!("Side set to {}", side);
        self.state.side = side;
        self.state.selected = None;

        if self.state.chain.is_some() {
            self.rewindow();
            return Vec::new();
        }
        self.state.window = ChainWindow {
            side,
            ..ChainWindow::default()
        };
        match self.state.expiration {
            Some(_) if self.is_pending(Slot::Chain) => Vec::new(),
            Some(expiration) => vec![self.chain_request(expiration)],
            None => Vec::new(),
        }
    }

    /// Pick a contract out of the visible window
    pub fn select_contract(&mut self, contract_id: &str) -> Result<&OptionContract> {
        let contract = self.state.window.find(contract_id).cloned().ok_or_else(|| {
            OptionsError::InvalidTransition(format!(
                "contract '{}' is not in the current window",
                contract_id
            ))
        })?;
        info!("Selected {} (strike {})", contract.contract_id, contract.strike);

        self.state.inputs.strike = contract.strike;
        if let Some(expiration) = self.state.expiration {
            self.state.inputs.days = self.days.days_until_date(expiration);
        }
        Ok(self.state.selected.insert(contract))
    }

    pub fn set_input(&mut self, field: InputField, value: f64) {
        self.state.inputs.set(field, value);
    }

    pub fn bump_input(&mut self, field: InputField, delta: f64) {
        self.state.inputs.bump(field, delta);
    }

    pub fn set_days(&mut self, days: u32) {
        self.state.inputs.days = days;
    }

    fn fail(&mut self, field: Field, err: OptionsError) -> OptionsError {
        self.state.errors.insert(field, err.user_message());
        err
    }

    /// Price `inputs`; the stored inputs become the submitted ones
    pub fn submit_calculation(&mut self, inputs: BsInputs) -> Result<Request> {
        self.state.inputs = inputs;
        if let Err(e) = inputs.validate() {
            return Err(self.fail(Field::Calculation, e));
        }
        self.state.errors.remove(&Field::Calculation);

        let request = inputs.to_calculate_request(self.days.date_after(inputs.days));
        let ticket = self.issue(Slot::Calculation);
        Ok(Request::Calculate { ticket, request })
    }

    /// Request a spot x volatility grid around the current inputs
    pub fn request_surface(&mut self, spread: Option<SurfaceDefaults>) -> Result<Request> {
        let spread = spread.unwrap_or(self.surface_range);
        let range = SurfaceRange::around(&self.state.inputs, &spread);
        self.surface_request(range, spread.steps)
    }

    /// Request a grid over explicitly edited spot and volatility bounds
    pub fn request_surface_within(&mut self, range: SurfaceRange) -> Result<Request> {
        let steps = self.surface_range.steps;
        self.surface_request(range, steps)
    }

    fn surface_request(&mut self, range: SurfaceRange, steps: u32) -> Result<Request> {
        let inputs = self.state.inputs;
        if !(inputs.strike > 0.0) {
            let err = OptionsError::InvalidTransition(
                "select a contract or enter a strike before requesting a surface".to_string(),
            );
            return Err(self.fail(Field::Surface, err));
        }
        let request = HeatmapRequest::within(&inputs, self.days.date_after(inputs.days), &range, steps)
            .map_err(|e| self.fail(Field::Surface, e))?;
        self.state.errors.remove(&Field::Surface);
        self.state.surface_range = Some(range);

        let ticket = self.issue(Slot::Surface);
        Ok(Request::Surface { ticket, request })
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        self.outstanding.get(&ticket.slot) == Some(ticket)
            && ticket.key == self.current_key(ticket.slot)
    }

    /// Feed back the outcome of a request; returns any follow-up requests
    pub fn apply(&mut self, ticket: &Ticket, response: Response) -> Vec<Request> {
        if response.slot() != ticket.slot {
            warn!(
                "{:?} response delivered under a {:?} ticket, ignoring",
                response.slot(),
                ticket.slot
            );
            return Vec::new();
        }
        if !self.is_current(ticket) {
            debug!(
                "Discarding stale {:?} response #{} for {}",
                ticket.slot, ticket.seq, ticket.key.symbol
            );
            if self.outstanding.get(&ticket.slot) == Some(ticket) {
                self.outstanding.remove(&ticket.slot);
            }
            return Vec::new();
        }
        self.outstanding.remove(&ticket.slot);

        match response {
            Response::Spot(result) => {
                self.on_spot(result);
                Vec::new()
            }
            Response::Expirations(result) => self.on_expirations(result),
            Response::Chain(result) => {
                self.on_chain(result);
                Vec::new()
            }
            Response::Calculation(result) => {
                match result {
                    Ok(calc) => {
                        self.state.errors.remove(&Field::Calculation);
                        self.state.calculation = Some(calc);
                    }
                    Err(e) => self.record_failure(Field::Calculation, e),
                }
                Vec::new()
            }
            Response::Surface(result) => {
                match result {
                    Ok(surface) => {
                        let scale = self.normalizer.normalize_surface(&surface);
                        debug!("Surface range {:.2}..{:.2}", scale.min, scale.max);
                        self.state.errors.remove(&Field::Surface);
                        self.state.scale = Some(scale);
                        self.state.surface = Some(surface);
                    }
                    Err(e) => self.record_failure(Field::Surface, e),
                }
                Vec::new()
            }
        }
    }

    fn record_failure(&mut self, field: Field, err: OptionsError) {
        warn!("{:?} request for '{}' failed: {}", field, self.state.symbol, err);
        self.state.errors.insert(field, err.user_message());
    }

    fn on_spot(&mut self, result: Result<SpotQuote>) {
        match result {
            Ok(quote) => {
                info!("Spot for {}: {:.2}", self.state.symbol, quote.spot);
                self.state.inputs.spot = quote.spot;
                self.state.spot = Some(quote);
                self.state.errors.remove(&Field::Symbol);
                if self.state.chain.is_some() {
                    self.rewindow();
                }
            }
            Err(e) => self.record_failure(Field::Symbol, e),
        }
    }

    fn on_expirations(&mut self, result: Result<Vec<NaiveDate>>) -> Vec<Request> {
        let dates = match result {
            Ok(dates) => dates,
            Err(e) => {
                self.state.expirations.clear();
                self.state.expiration = None;
                self.clear_chain();
                self.record_failure(Field::Expirations, e);
                return Vec::new();
            }
        };
        self.state.errors.remove(&Field::Expirations);
        self.state.expirations = dates;
        self.state.expirations_loaded = true;

        let Some(first) = self.state.expirations.first().copied() else {
            info!("No expirations listed for {}", self.state.symbol);
            self.state.expiration = None;
            return Vec::new();
        };
        self.state.expiration = Some(first);
        self.state.inputs.days = self.days.days_until_date(first);
        info!(
            "{} expirations for {}, defaulting to {} ({}d)",
            self.state.expirations.len(),
            self.state.symbol,
            first,
            self.state.inputs.days
        );
        vec![self.chain_request(first)]
    }

    fn on_chain(&mut self, result: Result<OptionChain>) {
        match result {
            Ok(chain) => {
                self.state.errors.remove(&Field::Chain);
                self.state.chain = Some(chain);
                self.state.selected = None;
                self.rewindow();
                info!(
                    "Windowed {} {} contracts for {}",
                    self.state.window.len(),
                    self.state.side,
                    self.state.symbol
                );
            }
            Err(e) => self.record_failure(Field::Chain, e),
        }
    }
}

impl Default for SelectionCoordinator {
    fn default() -> Self {
        Self::new(ChainWindower::default(), DayCounter::local())
    }
}
