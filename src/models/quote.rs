use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Response of `GET /spot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company: String,
    pub spot: f64,
    #[serde(default)]
    pub open: Option<f64>,
    /// Percentage change since the open
    #[serde(default)]
    pub change: Option<f64>,
}

impl SpotQuote {
    pub fn new(symbol: impl Into<String>, spot: f64) -> Self {
        Self {
            symbol: symbol.into(),
            company: String::new(),
            spot,
            open: None,
            change: None,
        }
    }
}

/// Response of `GET /expirations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationsResponse {
    #[serde(default)]
    pub expirations: Vec<String>,
}

impl ExpirationsResponse {
    /// Parse the date strings, dropping anything that is not `YYYY-MM-DD`.
    /// The result is ascending and de-duplicated.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .expirations
            .iter()
            .filter_map(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

/// Error body of a non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// One autocomplete hit from `GET /search`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_only_requires_price() {
        let q: SpotQuote = serde_json::from_str(r#"{"spot": 123.45}"#).unwrap();
        assert_eq!(q.spot, 123.45);
        assert!(q.company.is_empty());

        let q: SpotQuote = serde_json::from_str(
            r#"{"symbol":"AAPL","company":"Apple Inc.","spot":190.1,"open":188.0,"change":1.12}"#,
        )
        .unwrap();
        assert_eq!(q.company, "Apple Inc.");
        assert_eq!(q.change, Some(1.12));
    }

    #[test]
    fn expirations_parse_sorted_and_skip_garbage() {
        let resp = ExpirationsResponse {
            expirations: vec![
                "2025-08-15".to_string(),
                "2025-07-18".to_string(),
                "not-a-date".to_string(),
                "2025-07-18".to_string(),
            ],
        };
        let dates = resp.dates();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
                NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            ]
        );
    }
}
