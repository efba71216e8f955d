//! Command-line driver for options-chain
//!
//! Walks one ticker through the whole flow:
//! 1. Fetch spot and expirations, then the chain for the chosen expiration
//! 2. Print the strike window around the spot
//! 3. Price the contract nearest the money
//! 4. Render call and put pricing surfaces to `output/<TICKER>_heatmap.png`

use options_chain::api::RestClient;
use options_chain::config::{Config, DisplayPrefs};
use options_chain::error::{OptionsError, Result};
use options_chain::models::{OptionType, PricingSurface};
use options_chain::session::{Field, SelectionCoordinator, SelectionState, Session};
use options_chain::utils::{
    parse_iso_date, render_heatmaps, ChainWindower, DayCounter, SurfaceNormalizer, SurfaceScale,
};
use std::path::Path;
use tracing::{info, warn};

const USAGE: &str =
    "usage: options-chain <TICKER> [YYYY-MM-DD] [--put] [--vol PCT] [--rate PCT] [--div PCT]";

#[derive(Debug)]
struct CliArgs {
    ticker: String,
    expiration: Option<String>,
    side: OptionType,
    volatility_pct: f64,
    rate_pct: f64,
    dividend_yield_pct: f64,
}

fn parse_pct(flag: &str, value: Option<String>) -> Result<f64> {
    let value = value.ok_or_else(|| OptionsError::InvalidInput(format!("{} needs a value", flag)))?;
    value
        .parse::<f64>()
        .map_err(|_| OptionsError::InvalidInput(format!("{} expects a number, got '{}'", flag, value)))
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<CliArgs> {
    let mut ticker = None;
    let mut expiration = None;
    let mut side = OptionType::Call;
    let mut volatility_pct = 20.0;
    let mut rate_pct = 5.0;
    let mut dividend_yield_pct = 0.0;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--put" => side = OptionType::Put,
            "--call" => side = OptionType::Call,
            "--vol" => volatility_pct = parse_pct("--vol", args.next())?,
            "--rate" => rate_pct = parse_pct("--rate", args.next())?,
            "--div" => dividend_yield_pct = parse_pct("--div", args.next())?,
            flag if flag.starts_with("--") => {
                return Err(OptionsError::InvalidInput(format!("unknown flag {}", flag)))
            }
            _ if ticker.is_none() => ticker = Some(arg.clone()),
            _ if expiration.is_none() => expiration = Some(arg.clone()),
            _ => return Err(OptionsError::InvalidInput(format!("unexpected argument {}", arg))),
        }
    }

    let ticker = ticker.ok_or_else(|| OptionsError::InvalidInput(USAGE.to_string()))?;
    Ok(CliArgs {
        ticker,
        expiration,
        side,
        volatility_pct,
        rate_pct,
        dividend_yield_pct,
    })
}

fn log_window(state: &SelectionState) {
    info!(
        "{} {} chain, expiring {}, spot {}",
        state.symbol,
        state.side,
        state
            .expiration
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        state
            .spot
            .as_ref()
            .map(|q| format!("${:.2}", q.spot))
            .unwrap_or_else(|| "unknown".to_string())
    );
    for (i, c) in state.window.contracts.iter().enumerate() {
        let marker = if Some(i) == state.window.center { ">" } else { " " };
        info!(
            "{} {:<22} strike {:>8.2}  last {:>7.2}  bid {:>7.2}  ask {:>7.2}  {}",
            marker,
            c.contract_id,
            c.strike,
            c.last_price,
            c.bid,
            c.ask,
            if c.in_the_money { "ITM" } else { "" }
        );
    }
}

fn render(
    surface: &PricingSurface,
    scale: &SurfaceScale,
    ticker: &str,
    prefs: &DisplayPrefs,
) -> Result<()> {
    let output_dir = Path::new("output");
    if !output_dir.exists() {
        std::fs::create_dir(output_dir)?;
    }

    let path = output_dir.join(format!("{}_heatmap.png", ticker));
    let title = format!("{} pricing surface", ticker);
    render_heatmaps(surface, scale, &title, prefs.theme, &path)?;
    info!("Pricing surface saved to {:?}", path);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    config.init_logging()?;

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return Err(e);
        }
    };
    let prefs = DisplayPrefs::load(&config.prefs_path)?;

    info!("Using price service at {}", config.service.base_url);
    let client = RestClient::new(config.service.clone())?;
    let coordinator = SelectionCoordinator::new(
        ChainWindower::new(config.window_size),
        DayCounter::local(),
    )
    .with_normalizer(SurfaceNormalizer::new(prefs.gradient.gradient()))
    .with_surface_range(config.surface);
    let mut session = Session::new(client, coordinator);

    for hit in session.search(&args.ticker).await.iter().take(5) {
        info!("Match: {} ({})", hit.symbol, hit.name);
    }

    let state = session.set_symbol(&args.ticker).await;
    if let Some(msg) = state.error(Field::Symbol) {
        warn!("{}", msg);
        return Ok(());
    }
    if let Some(msg) = state.error(Field::Expirations) {
        warn!("{}", msg);
        return Ok(());
    }
    if state.has_no_expirations() {
        warn!("No expirations listed for {}. Exiting.", state.symbol);
        return Ok(());
    }
    let ticker = state.symbol.clone();

    if let Some(raw) = &args.expiration {
        session.set_expiration(parse_iso_date(raw)?).await?;
    }
    if args.side != session.state().side {
        session.set_side(args.side).await;
    }

    let state = session.state();
    if let Some(msg) = state.error(Field::Chain) {
        warn!("{}", msg);
        return Ok(());
    }
    if state.window.is_empty() {
        warn!("No {} contracts for {}. Exiting.", args.side, ticker);
        return Ok(());
    }
    log_window(state);

    let center = match state.window.center_contract().or(state.window.contracts.first()) {
        Some(contract) => contract.contract_id.clone(),
        None => return Ok(()),
    };
    session.select_contract(&center)?;

    let mut inputs = session.state().inputs;
    inputs.volatility_pct = args.volatility_pct;
    inputs.rate_pct = args.rate_pct;
    inputs.dividend_yield_pct = args.dividend_yield_pct;

    let state = session.submit_calculation(inputs).await?;
    match (&state.calculation, state.error(Field::Calculation)) {
        (Some(calc), _) => {
            info!(
                "{} strike {:.2}, {}d: call ${:.4}, put ${:.4}",
                center, inputs.strike, inputs.days, calc.call_price, calc.put_price
            );
            if let Some(g) = &calc.greeks {
                info!(
                    "delta {:.4}/{:.4} gamma {:.4} vega {:.4}",
                    g.delta_call, g.delta_put, g.gamma, g.vega
                );
            }
        }
        (None, Some(msg)) => warn!("Pricing failed: {}", msg),
        (None, None) => {}
    }

    let state = session.request_surface(None).await?;
    match (&state.surface, &state.scale) {
        (Some(surface), Some(scale)) => render(surface, scale, &ticker, &prefs)?,
        _ => {
            if let Some(msg) = state.error(Field::Surface) {
                warn!("Surface request failed: {}", msg);
            }
        }
    }

    info!("Done");
    Ok(())
}
