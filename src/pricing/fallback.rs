use std::sync::Arc;
use chrono::{DateTime, Utc};

use super::error::PriceError;
use super::feed_registry::{FeedRegistry, normalize_symbol};
use super::quote::{PriceOrigin, PriceQuote};
use crate::constants::FALLBACK_PRICE_DECIMALS;

/// Static prices served when a feed cannot be read
#[derive(Debug, Clone)]
pub struct FallbackPriceTable {
    registry: Arc<FeedRegistry>,
}

impl FallbackPriceTable {
    pub fn new(registry: Arc<FeedRegistry>) -> Self {
        Self { registry }
    }

    pub fn lookup(&self, symbol: &str, now: DateTime<Utc>) -> Result<PriceQuote, PriceError> {
        let symbol = normalize_symbol(symbol);
        let price = self
            .registry
            .fallback_price(&symbol)
            .ok_or_else(|| PriceError::NoFallback(symbol.clone()))?;
        Ok(PriceQuote {
            symbol,
            price,
            decimals: FALLBACK_PRICE_DECIMALS,
            observed_at: now,
            origin: PriceOrigin::Fallback,
        })
    }
}
