use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::error::PriceError;
use super::fallback::FallbackPriceTable;
use super::feed_registry::{FeedRegistry, normalize_symbol};
use super::oracle_client::{ChainlinkTransport, FeedTransport, OracleClient};
use super::quote::{CachedPrice, PriceQuote};
use crate::config::Config;

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: PriceQuote,
    cached_at: DateTime<Utc>,
}

/// Read-through price cache: TTL-bounded, backed by the oracle with a static fallback.
///
/// Refresh is lazy. An entry is served while `now - cached_at < ttl`; the next read after
/// that goes back to the oracle. Fallback quotes are cached like live ones, so after an
/// outage the fallback keeps being served until its entry expires.
///
/// No lock is held across a remote read. Concurrent misses on one symbol may each reach
/// the oracle; the last write wins.
pub struct PriceCache<T, C = SystemClock> {
    oracle: OracleClient<T>,
    fallback: FallbackPriceTable,
    registry: Arc<FeedRegistry>,
    clock: C,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PriceCache<ChainlinkTransport, SystemClock> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ChainlinkTransport::new(config.ethereum_provider.clone()),
            config.feed_registry.clone(),
            SystemClock,
            config.price_cache_ttl,
        )
    }
}

impl<T: FeedTransport, C: Clock> PriceCache<T, C> {
    pub fn new(transport: T, registry: Arc<FeedRegistry>, clock: C, ttl: Duration) -> Self {
        Self {
            oracle: OracleClient::new(transport, registry.clone()),
            fallback: FallbackPriceTable::new(registry.clone()),
            registry,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[instrument(skip(self))]
    pub async fn get_price(&self, symbol: &str) -> Result<PriceQuote, PriceError> {
        let symbol = normalize_symbol(symbol);

        if let Some(entry) = self.entries.read().await.get(&symbol) {
            if self.is_fresh(entry, self.clock.now()) {
                debug!(symbol = %symbol, cached_at = %entry.cached_at, "Serving cached price");
                return Ok(entry.quote.clone());
            }
        }

        let quote = match self.oracle.fetch_price(&symbol).await {
            Ok(quote) => quote,
            Err(oracle_err) => {
                match &oracle_err {
                    PriceError::UnsupportedSymbol(_) => {
                        debug!(symbol = %symbol, "No oracle feed registered, using fallback price")
                    }
                    _ => warn!(symbol = %symbol, error = %oracle_err, "Oracle price unavailable, using fallback price"),
                }
                match self.fallback.lookup(&symbol, self.clock.now()) {
                    Ok(quote) => quote,
                    Err(fallback_err) => {
                        error!(symbol = %symbol, error = %fallback_err, "No price available from oracle or fallback");
                        return Err(if self.registry.is_known(&symbol) {
                            fallback_err
                        } else {
                            PriceError::UnsupportedSymbol(symbol)
                        });
                    }
                }
            }
        };

        let cached_at = self.clock.now();
        self.entries.write().await.insert(
            symbol,
            CacheEntry {
                quote: quote.clone(),
                cached_at,
            },
        );
        Ok(quote)
    }

    #[instrument(skip(self))]
    pub async fn clear_cache(&self) {
        let mut entries = self.entries.write().await;
        let cleared = entries.len();
        entries.clear();
        info!(cleared, "Price cache cleared");
    }

    /// Every stored entry, stale ones included, sorted by symbol
    pub async fn cached_prices(&self) -> Vec<CachedPrice> {
        let entries = self.entries.read().await;
        let mut cached: Vec<CachedPrice> = entries
            .iter()
            .map(|(symbol, entry)| CachedPrice {
                symbol: symbol.clone(),
                price: entry.quote.price,
                origin: entry.quote.origin,
                cached_at: entry.cached_at,
            })
            .collect();
        cached.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        cached
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.cached_at).to_std() {
            Ok(age) => age < self.ttl,
            // clock stepped backwards
            Err(_) => true,
        }
    }
}
