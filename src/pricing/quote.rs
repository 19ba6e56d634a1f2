use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a quote's price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceOrigin {
    #[serde(rename = "chainlink")]
    Live,
    #[serde(rename = "fallback")]
    Fallback,
}

/// A USD price for one symbol. Never mutated; the next fetch replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub decimals: u8,
    pub observed_at: DateTime<Utc>,
    pub origin: PriceOrigin,
}

/// Read-only view of one cache entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrice {
    pub symbol: String,
    pub price: f64,
    pub origin: PriceOrigin,
    pub cached_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn origin_serializes_with_source_tags() {
        let quote = PriceQuote {
            symbol: "ETH".to_string(),
            price: 3200.0,
            decimals: 8,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            origin: PriceOrigin::Live,
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["origin"], "chainlink");
        assert_eq!(json["observedAt"], "2024-05-01T12:00:00Z");
        assert_eq!(serde_json::to_value(PriceOrigin::Fallback).unwrap(), "fallback");
    }
}
