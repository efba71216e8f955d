use async_trait::async_trait;
use chrono::NaiveDate;
use options_chain::error::{OptionsError, Result};
use options_chain::models::{
    CalculateRequest, CalculationResult, HeatmapRequest, OptionChain, OptionContract, OptionType,
    PricingSurface, SearchResult, SpotQuote,
};
use options_chain::session::{execute, Field, SelectionCoordinator, Session, Slot};
use options_chain::utils::{ChainWindower, DayCounter, SurfaceNormalizer};
use options_chain::PriceService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const EXPIRY: (i32, u32, u32) = (2025, 7, 18);

/// Price service whose AAPL chain is held back until the test releases it
#[derive(Clone, Default)]
struct GatedService {
    aapl_chain_gate: Arc<Notify>,
    chain_calls: Arc<AtomicUsize>,
}

fn chain_for(ticker: &str, spot: f64) -> OptionChain {
    let strikes: Vec<f64> = (-10..=10).map(|i| (spot / 5.0).round() * 5.0 + 5.0 * i as f64).collect();
    let side = |tag: &str| {
        strikes
            .iter()
            .map(|&k| {
                let mut c = OptionContract::new(format!("{}250718{}{:08}", ticker, tag, (k * 1000.0) as u64), k);
                c.bid = 1.0;
                c.ask = 1.2;
                c
            })
            .collect()
    };
    OptionChain {
        calls: side("C"),
        puts: side("P"),
    }
}

fn spot_of(ticker: &str) -> Option<f64> {
    match ticker {
        "AAPL" => Some(196.45),
        "MSFT" => Some(412.3),
        _ => None,
    }
}

#[async_trait]
impl PriceService for GatedService {
    async fn spot(&self, ticker: &str) -> Result<SpotQuote> {
        spot_of(ticker)
            .map(|s| SpotQuote::new(ticker, s))
            .ok_or_else(|| OptionsError::NotFound(format!("Ticker {} not found or no price data", ticker)))
    }

    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        spot_of(ticker)
            .map(|_| vec![date(EXPIRY.0, EXPIRY.1, EXPIRY.2)])
            .ok_or_else(|| OptionsError::NotFound(format!("Ticker {} not found or no price data", ticker)))
    }

    async fn option_chain(&self, ticker: &str, _expiration: NaiveDate) -> Result<OptionChain> {
        self.chain_calls.fetch_add(1, Ordering::SeqCst);
        if ticker == "AAPL" {
            self.aapl_chain_gate.notified().await;
        }
        let spot = spot_of(ticker).ok_or_else(|| OptionsError::NotFound("no chain".to_string()))?;
        Ok(chain_for(ticker, spot))
    }

    async fn calculate(&self, request: &CalculateRequest) -> Result<CalculationResult> {
        // intrinsic value is enough to check what crossed the wire
        Ok(CalculationResult {
            call_price: (request.spot - request.strike).max(0.0),
            put_price: (request.strike - request.spot).max(0.0),
            greeks: None,
        })
    }

    async fn heatmap(&self, request: &HeatmapRequest) -> Result<PricingSurface> {
        let n = request.spot_steps as usize;
        let m = request.vol_steps as usize;
        let step = |lo: f64, hi: f64, count: usize, i: usize| lo + (hi - lo) * i as f64 / (count - 1) as f64;
        let spots: Vec<f64> = (0..n).map(|j| step(request.spot_min, request.spot_max, n, j)).collect();
        let vols: Vec<f64> = (0..m).map(|i| step(request.vol_min, request.vol_max, m, i)).collect();
        let call = ndarray::Array2::from_shape_fn((m, n), |(i, j)| (spots[j] - request.strike).max(0.0) + vols[i] * 10.0);
        let put = ndarray::Array2::from_shape_fn((m, n), |(i, j)| (request.strike - spots[j]).max(0.0) + vols[i] * 10.0);
        Ok(PricingSurface {
            spots,
            vols,
            call_prices: call,
            put_prices: put,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        Ok(["AAPL", "MSFT"]
            .iter()
            .filter(|s| s.starts_with(&query.to_uppercase()))
            .map(|s| SearchResult {
                symbol: s.to_string(),
                name: String::new(),
            })
            .collect())
    }
}

fn session(service: GatedService) -> Session<GatedService> {
    let coordinator = SelectionCoordinator::new(
        ChainWindower::default(),
        DayCounter::fixed(date(2025, 6, 18)),
    )
    .with_normalizer(SurfaceNormalizer::default());
    Session::new(service, coordinator)
}

#[tokio::test]
async fn slow_chain_for_a_replaced_symbol_never_lands() {
    let service = GatedService::default();
    let mut session = session(service.clone());

    let first = session.coordinator_mut().set_symbol("AAPL");
    let responses = session.fetch(first).await;
    let chain_requests = session.apply_all(responses);
    assert_eq!(chain_requests.len(), 1);
    assert!(session.coordinator().is_pending(Slot::Chain));

    // the AAPL chain is in flight on another task while the user moves on
    let in_flight = {
        let service = service.clone();
        let request = chain_requests.into_iter().next().unwrap();
        tokio::spawn(async move { execute(&service, request).await })
    };

    // MSFT's chain is not gated, so this settles completely
    let state = session.set_symbol("msft").await;
    assert_eq!(state.symbol, "MSFT");
    assert_eq!(state.window.len(), 9);

    service.aapl_chain_gate.notify_one();
    let late = in_flight.await.unwrap();
    assert!(session.apply_all(vec![late]).is_empty());

    let state = session.state();
    assert!(state
        .window
        .contracts
        .iter()
        .all(|c| c.contract_id.starts_with("MSFT")));
    assert_eq!(state.window.center_contract().unwrap().strike, 415.0);
    assert_eq!(service.chain_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn browse_select_price_and_render_scale() {
    let service = GatedService::default();
    let mut session = session(service.clone());

    let state = session.set_symbol("MSFT").await;
    assert_eq!(state.expiration, Some(date(2025, 7, 18)));
    assert_eq!(state.inputs.days, 30);
    let strikes = state.window.strikes();
    assert_eq!(strikes.len(), 9);
    assert!(strikes.windows(2).all(|w| w[0] < w[1]));
    assert!(strikes.contains(&415.0));

    session.set_side(OptionType::Put).await;
    assert_eq!(service.chain_calls.load(Ordering::SeqCst), 1);

    let id = session.state().window.center_contract().unwrap().contract_id.clone();
    let state = session.select_contract(&id).unwrap();
    assert_eq!(state.inputs.strike, 415.0);

    let mut inputs = state.inputs;
    inputs.volatility_pct = 22.0;
    inputs.rate_pct = 4.0;
    let state = session.submit_calculation(inputs).await.unwrap();
    let calc = state.calculation.as_ref().unwrap();
    assert!((calc.put_price - 2.7).abs() < 1e-9);
    assert_eq!(calc.call_price, 0.0);

    let state = session.request_surface(None).await.unwrap();
    let surface = state.surface.as_ref().unwrap();
    assert_eq!(surface.shape(), (10, 10));
    let scale = state.scale.unwrap();
    let max_cell = surface
        .call_prices
        .iter()
        .chain(surface.put_prices.iter())
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(scale.max, max_cell);
    assert_eq!(scale.fraction(max_cell), 1.0);
    assert_eq!(scale.hue_of(max_cell), Some(60.0));
}

#[tokio::test]
async fn unknown_ticker_then_recovery() {
    let mut session = session(GatedService::default());
    let state = session.set_symbol("NOPE").await;
    assert_eq!(
        state.error(Field::Symbol),
        Some("Ticker NOPE not found or no price data")
    );
    assert!(state.window.is_empty());

    let state = session.set_symbol("MSFT").await;
    assert!(state.errors.is_empty());
    assert_eq!(state.window.len(), 9);
}
