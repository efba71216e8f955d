use crate::error::{OptionsError, Result};
use crate::utils::Gradient;
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the external price service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL the endpoint paths (`/spot`, `/heatmap`, ...) are appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api/bs".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Defaults for the pricing surface requested around a selected contract
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SurfaceDefaults {
    /// Grid points on each axis
    pub steps: u32,
    /// Spot axis spans `spot * (1 +/- spot_spread)`
    pub spot_spread: f64,
    /// Volatility axis spans `vol * (1 +/- vol_spread)`
    pub vol_spread: f64,
}

impl Default for SurfaceDefaults {
    fn default() -> Self {
        Self {
            steps: 10,
            spot_spread: 0.2,
            vol_spread: 0.5,
        }
    }
}

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Price service configuration
    pub service: ServiceConfig,
    /// Log level
    pub log_level: String,
    /// Number of contracts kept in the visible chain window
    pub window_size: usize,
    /// Pricing surface defaults
    pub surface: SurfaceDefaults,
    /// Where display preferences are persisted
    pub prefs_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            log_level: "info".to_string(),
            window_size: 9,
            surface: SurfaceDefaults::default(),
            prefs_path: PathBuf::from("display_prefs.json"),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|_| {
            OptionsError::ConfigError(format!("{} has an invalid value: {:?}", name, value))
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let base_url = lookup("PRICE_SERVICE_URL")
            .unwrap_or(defaults.service.base_url)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(OptionsError::ConfigError(
                "PRICE_SERVICE_URL must not be empty".to_string(),
            ));
        }

        let timeout_secs = parse_var(
            "PRICE_SERVICE_TIMEOUT_SECS",
            lookup("PRICE_SERVICE_TIMEOUT_SECS"),
            defaults.service.timeout_secs,
        )?;
        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);
        let window_size = parse_var(
            "CHAIN_WINDOW_SIZE",
            lookup("CHAIN_WINDOW_SIZE"),
            defaults.window_size,
        )?;
        if window_size == 0 {
            return Err(OptionsError::ConfigError(
                "CHAIN_WINDOW_SIZE must be at least 1".to_string(),
            ));
        }

        let steps = parse_var("HEATMAP_STEPS", lookup("HEATMAP_STEPS"), defaults.surface.steps)?;
        if steps < 2 {
            return Err(OptionsError::ConfigError(
                "HEATMAP_STEPS must be at least 2".to_string(),
            ));
        }
        let spot_spread = parse_var(
            "HEATMAP_SPOT_SPREAD",
            lookup("HEATMAP_SPOT_SPREAD"),
            defaults.surface.spot_spread,
        )?;
        let vol_spread = parse_var(
            "HEATMAP_VOL_SPREAD",
            lookup("HEATMAP_VOL_SPREAD"),
            defaults.surface.vol_spread,
        )?;
        let prefs_path = lookup("DISPLAY_PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.prefs_path);

        Ok(Config {
            service: ServiceConfig {
                base_url,
                timeout_secs,
            },
            log_level,
            window_size,
            surface: SurfaceDefaults {
                steps,
                spot_spread,
                vol_spread,
            },
            prefs_path,
        })
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| OptionsError::ConfigError(format!("Failed to init logging: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientChoice {
    #[default]
    HueSweep,
    Viridis,
}

impl GradientChoice {
    pub fn gradient(self) -> Gradient {
        match self {
            GradientChoice::HueSweep => Gradient::default(),
            GradientChoice::Viridis => Gradient::Viridis,
        }
    }
}

/// Persisted display preferences.
///
/// Loaded once at startup and saved explicitly; nothing reads the file behind
/// the caller's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayPrefs {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub gradient: GradientChoice,
}

impl DisplayPrefs {
    /// Load preferences, falling back to defaults when the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No display preferences at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let prefs = serde_json::from_str(&raw)?;
        Ok(prefs)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved display preferences to {:?}", path);
        Ok(())
    }

    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.service.base_url, "http://127.0.0.1:8000/api/bs");
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert_eq!(config.window_size, 9);
        assert_eq!(config.surface, SurfaceDefaults::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn overrides_are_parsed_and_trailing_slash_dropped() {
        let config = Config::from_lookup(lookup_from(&[
            ("PRICE_SERVICE_URL", "http://pricer:9000/api/bs/"),
            ("CHAIN_WINDOW_SIZE", "11"),
            ("HEATMAP_STEPS", "20"),
            ("HEATMAP_VOL_SPREAD", "0.25"),
        ]))
        .unwrap();
        assert_eq!(config.service.base_url, "http://pricer:9000/api/bs");
        assert_eq!(config.window_size, 11);
        assert_eq!(config.surface.steps, 20);
        assert_eq!(config.surface.vol_spread, 0.25);
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Config::from_lookup(lookup_from(&[("CHAIN_WINDOW_SIZE", "nine")])).unwrap_err();
        assert!(matches!(err, OptionsError::ConfigError(_)));

        let err = Config::from_lookup(lookup_from(&[("HEATMAP_STEPS", "1")])).unwrap_err();
        assert!(matches!(err, OptionsError::ConfigError(_)));
    }

    #[test]
    fn display_prefs_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        assert_eq!(DisplayPrefs::load(&path).unwrap(), DisplayPrefs::default());

        let mut prefs = DisplayPrefs::default();
        prefs.toggle_theme();
        prefs.gradient = GradientChoice::Viridis;
        prefs.save(&path).unwrap();

        let loaded = DisplayPrefs::load(&path).unwrap();
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.gradient, GradientChoice::Viridis);
    }

    #[test]
    fn partial_prefs_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        let loaded = DisplayPrefs::load(&path).unwrap();
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.gradient, GradientChoice::HueSweep);
    }
}
