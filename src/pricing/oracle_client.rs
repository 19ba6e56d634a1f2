use std::future::Future;
use std::sync::Arc;
use chrono::{DateTime, TimeZone, Utc};
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, I256, U256};
use tracing::{debug, instrument};

use super::error::PriceError;
use super::feed_registry::{FeedRegistry, normalize_symbol};
use super::quote::{PriceOrigin, PriceQuote};

// ABI for Chainlink AggregatorV3Interface
abigen!(
    AggregatorV3Interface,
    r#"[
        function latestRoundData() external view returns (uint80, int256, uint256, uint256, uint80)
        function decimals() external view returns (uint8)
    ]"#
);

/// Result of `latestRoundData()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u128,
    pub answer: I256,
    pub started_at: U256,
    pub updated_at: U256,
    pub answered_in_round: u128,
}

impl RoundData {
    /// `updatedAt` as a timestamp; `None` for an incomplete round
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        if self.updated_at.is_zero() || self.updated_at > U256::from(i64::MAX as u64) {
            return None;
        }
        Utc.timestamp_opt(self.updated_at.as_u64() as i64, 0).single()
    }
}

/// The two read-only calls made against a price feed contract
pub trait FeedTransport: Send + Sync {
    fn latest_round_data(&self, feed: Address) -> impl Future<Output = eyre::Result<RoundData>> + Send;
    fn decimals(&self, feed: Address) -> impl Future<Output = eyre::Result<u8>> + Send;
}

/// Reads Chainlink aggregators over JSON-RPC
#[derive(Debug, Clone)]
pub struct ChainlinkTransport {
    provider: Arc<Provider<Http>>,
}

impl ChainlinkTransport {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }
}

impl FeedTransport for ChainlinkTransport {
    async fn latest_round_data(&self, feed: Address) -> eyre::Result<RoundData> {
        let contract = AggregatorV3Interface::new(feed, self.provider.clone());
        let (round_id, answer, started_at, updated_at, answered_in_round) =
            contract.latest_round_data().call().await?;
        Ok(RoundData {
            round_id,
            answer,
            started_at,
            updated_at,
            answered_in_round,
        })
    }

    async fn decimals(&self, feed: Address) -> eyre::Result<u8> {
        let contract = AggregatorV3Interface::new(feed, self.provider.clone());
        Ok(contract.decimals().call().await?)
    }
}

/// Resolves a symbol to its feed and reads a live price. No retries.
#[derive(Debug, Clone)]
pub struct OracleClient<T> {
    transport: T,
    registry: Arc<FeedRegistry>,
}

impl<T: FeedTransport> OracleClient<T> {
    pub fn new(transport: T, registry: Arc<FeedRegistry>) -> Self {
        Self { transport, registry }
    }

    #[instrument(skip(self))]
    pub async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote, PriceError> {
        let symbol = normalize_symbol(symbol);
        let feed = self
            .registry
            .feed_address(&symbol)
            .ok_or_else(|| PriceError::UnsupportedSymbol(symbol.clone()))?;

        let round = self
            .transport
            .latest_round_data(feed)
            .await
            .map_err(|e| PriceError::oracle_unavailable(&symbol, format!("latestRoundData on {:?}: {:#}", feed, e)))?;
        let decimals = self
            .transport
            .decimals(feed)
            .await
            .map_err(|e| PriceError::oracle_unavailable(&symbol, format!("decimals on {:?}: {:#}", feed, e)))?;

        if round.answer <= I256::zero() {
            return Err(PriceError::oracle_unavailable(
                &symbol,
                format!("feed {:?} returned invalid answer {}", feed, round.answer),
            ));
        }
        let observed_at = round.updated_at_utc().ok_or_else(|| {
            PriceError::oracle_unavailable(&symbol, format!("feed {:?} round {} has no update time", feed, round.round_id))
        })?;

        let price = ethers::utils::format_units(round.answer, decimals as usize)
            .map_err(|e| PriceError::oracle_unavailable(&symbol, e))?
            .parse::<f64>()
            .map_err(|e| PriceError::oracle_unavailable(&symbol, e))?;

        debug!(
            symbol = %symbol,
            feed = ?feed,
            round_id = round.round_id,
            decimals,
            price,
            "Fetched live oracle price"
        );

        Ok(PriceQuote {
            symbol,
            price,
            decimals,
            observed_at,
            origin: PriceOrigin::Live,
        })
    }
}
