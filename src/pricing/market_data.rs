use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use eyre::{Report, eyre};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::clock::Clock;
use super::error::PriceError;
use super::feed_registry::normalize_symbol;
use super::oracle_client::FeedTransport;
use super::price_cache::PriceCache;
use super::quote::PriceQuote;
use crate::constants::{
    DEFAULT_SUPPLY_MULTIPLIER, MARKET_CAP_SUPPLY_MULTIPLIERS, MARKET_SNAPSHOT_ASSETS, TVL_MARKET_CAP_RATIO,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub amount: f64,
}

impl Holding {
    pub fn new(symbol: &str, amount: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            amount,
        }
    }
}

/// Parses `SYMBOL=AMOUNT`, e.g. `ETH=2.5`
impl FromStr for Holding {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, amount) = s
            .split_once('=')
            .ok_or_else(|| eyre!("Invalid holding '{}', expected SYMBOL=AMOUNT", s))?;
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(eyre!("Invalid holding '{}', missing symbol", s));
        }
        let amount = amount
            .trim()
            .parse::<f64>()
            .map_err(|e| eyre!("Invalid amount in holding '{}': {}", s, e))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(eyre!("Invalid amount in holding '{}', must be a finite non-negative number", s));
        }
        Ok(Holding::new(symbol, amount))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub symbol: String,
    pub amount: f64,
    pub unit_price_usd: f64,
    pub total_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub total_usd: f64,
    pub breakdown: Vec<HoldingValuation>,
}

/// Rough market overview across the main assets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub prices: Vec<PriceQuote>,
    pub market_cap_usd: f64,
    pub total_value_locked_usd: f64,
    pub last_updated: DateTime<Utc>,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Market snapshot @ {}", self.last_updated.to_rfc3339())?;
        for quote in &self.prices {
            writeln!(f, "  {:<6} ${:>14.4}  ({:?})", quote.symbol, quote.price, quote.origin)?;
        }
        writeln!(f, "  market cap ${:.2}", self.market_cap_usd)?;
        write!(f, "  TVL        ${:.2}", self.total_value_locked_usd)
    }
}

fn supply_multiplier(symbol: &str) -> f64 {
    MARKET_CAP_SUPPLY_MULTIPLIERS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_SUPPLY_MULTIPLIER)
}

impl<T: FeedTransport, C: Clock> PriceCache<T, C> {
    /// Prices in input order; any single failure fails the whole batch
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn get_multiple_prices(&self, symbols: &[String]) -> Result<Vec<PriceQuote>, PriceError> {
        let quotes = try_join_all(symbols.iter().map(|symbol| self.get_price(symbol))).await?;
        debug!(count = quotes.len(), "Fetched batch prices");
        Ok(quotes)
    }

    pub async fn convert_usd_to_eth(&self, usd_amount: f64) -> Result<f64, PriceError> {
        let eth = self.get_price("ETH").await?;
        Ok(usd_amount / eth.price)
    }

    pub async fn convert_eth_to_usd(&self, eth_amount: f64) -> Result<f64, PriceError> {
        let eth = self.get_price("ETH").await?;
        Ok(eth_amount * eth.price)
    }

    /// Values each holding at one price per distinct symbol and sums in USD
    #[instrument(skip(self, holdings), fields(holding_count = holdings.len(), on_close = true))]
    pub async fn calculate_portfolio_value(&self, holdings: &[Holding]) -> Result<PortfolioValuation, PriceError> {
        let mut distinct: Vec<String> = Vec::new();
        for holding in holdings {
            let symbol = normalize_symbol(&holding.symbol);
            if !distinct.contains(&symbol) {
                distinct.push(symbol);
            }
        }

        let quotes = self.get_multiple_prices(&distinct).await?;
        let unit_prices: HashMap<String, f64> = quotes.into_iter().map(|q| (q.symbol, q.price)).collect();

        let mut breakdown = Vec::with_capacity(holdings.len());
        for holding in holdings {
            let symbol = normalize_symbol(&holding.symbol);
            let unit_price_usd = unit_prices
                .get(&symbol)
                .copied()
                .ok_or_else(|| PriceError::UnsupportedSymbol(symbol.clone()))?;
            breakdown.push(HoldingValuation {
                symbol,
                amount: holding.amount,
                unit_price_usd,
                total_usd: holding.amount * unit_price_usd,
            });
        }
        let total_usd = breakdown.iter().map(|h| h.total_usd).sum();

        info!(total_usd, distinct_symbols = distinct.len(), "Portfolio valued");
        Ok(PortfolioValuation { total_usd, breakdown })
    }

    #[instrument(skip(self), fields(on_close = true))]
    pub async fn get_market_data(&self) -> Result<MarketSnapshot, PriceError> {
        let symbols: Vec<String> = MARKET_SNAPSHOT_ASSETS.iter().map(|s| s.to_string()).collect();
        let prices = self.get_multiple_prices(&symbols).await?;

        let market_cap_usd: f64 = prices
            .iter()
            .map(|q| q.price * supply_multiplier(&q.symbol))
            .sum();

        Ok(MarketSnapshot {
            prices,
            market_cap_usd,
            total_value_locked_usd: market_cap_usd * TVL_MARKET_CAP_RATIO,
            last_updated: self.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use crate::pricing::clock::ManualClock;
    use crate::pricing::feed_registry::FeedRegistry;
    use crate::pricing::quote::PriceOrigin;
    use crate::pricing::test_support::{ScriptedTransport, feed, test_start};

    fn fallback_only_cache(transport: &ScriptedTransport) -> PriceCache<ScriptedTransport, ManualClock> {
        let registry = FeedRegistry::new()
            .with_feed("ETH", feed(1))
            .with_fallback("ETH", 3200.0)
            .and_then(|r| r.with_fallback("BTC", 67000.0))
            .and_then(|r| r.with_fallback("LINK", 14.0))
            .and_then(|r| r.with_fallback("USDC", 1.0))
            .unwrap();
        transport.set_failing(true);
        PriceCache::new(
            transport.clone(),
            Arc::new(registry),
            ManualClock::new(test_start()),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn values_portfolio_at_fallback_price() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);

        let valuation = cache.calculate_portfolio_value(&[Holding::new("ETH", 2.0)]).await.unwrap();
        assert_eq!(valuation.total_usd, 6400.0);
        assert_eq!(
            valuation.breakdown,
            vec![HoldingValuation {
                symbol: "ETH".to_string(),
                amount: 2.0,
                unit_price_usd: 3200.0,
                total_usd: 6400.0,
            }]
        );
    }

    #[tokio::test]
    async fn portfolio_fetches_each_distinct_symbol_once() {
        let transport = ScriptedTransport::new().with_answer(feed(1), 3_000_00000000, 8);
        let registry = FeedRegistry::new().with_feed("ETH", feed(1)).with_fallback("USDC", 1.0).unwrap();
        let cache = PriceCache::new(
            transport.clone(),
            Arc::new(registry),
            ManualClock::new(test_start()),
            Duration::from_secs(300),
        );

        let holdings = [
            Holding::new("ETH", 1.5),
            Holding::new("usdc", 250.0),
            Holding::new("eth", 0.5),
        ];
        let valuation = cache.calculate_portfolio_value(&holdings).await.unwrap();
        assert_eq!(transport.round_data_calls(), 1);
        assert_eq!(valuation.breakdown.len(), 3);
        assert_eq!(valuation.breakdown[2].symbol, "ETH");
        assert_eq!(valuation.breakdown[2].total_usd, 1500.0);
        assert_eq!(valuation.total_usd, 4500.0 + 250.0 + 1500.0);
    }

    #[tokio::test]
    async fn empty_portfolio_is_worth_nothing() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);
        let valuation = cache.calculate_portfolio_value(&[]).await.unwrap();
        assert_eq!(valuation.total_usd, 0.0);
        assert!(valuation.breakdown.is_empty());
    }

    #[tokio::test]
    async fn converts_between_usd_and_eth() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);
        assert_eq!(cache.convert_usd_to_eth(6400.0).await.unwrap(), 2.0);
        assert_eq!(cache.convert_eth_to_usd(0.5).await.unwrap(), 1600.0);
    }

    #[tokio::test]
    async fn batch_fails_as_a_whole_on_unknown_symbol() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);
        let symbols = vec!["ETH".to_string(), "UNKNOWN".to_string()];
        assert_eq!(
            cache.get_multiple_prices(&symbols).await,
            Err(PriceError::UnsupportedSymbol("UNKNOWN".to_string()))
        );
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);
        let symbols = vec!["usdc".to_string(), "BTC".to_string(), "eth".to_string()];
        let quotes = cache.get_multiple_prices(&symbols).await.unwrap();
        let got: Vec<(&str, f64)> = quotes.iter().map(|q| (q.symbol.as_str(), q.price)).collect();
        assert_eq!(got, vec![("USDC", 1.0), ("BTC", 67000.0), ("ETH", 3200.0)]);
    }

    #[tokio::test]
    async fn market_snapshot_estimates_cap_and_tvl() {
        let transport = ScriptedTransport::new();
        let cache = fallback_only_cache(&transport);

        let snapshot = cache.get_market_data().await.unwrap();
        let expected_cap = 3200.0 * 120_000_000.0 + 67000.0 * 19_000_000.0 + 14.0 * 617_000_000.0 + 32_000_000_000.0;
        assert_eq!(snapshot.prices.len(), 4);
        assert!(snapshot.prices.iter().all(|q| q.origin == PriceOrigin::Fallback));
        assert!((snapshot.market_cap_usd - expected_cap).abs() < 1e-3);
        assert!((snapshot.total_value_locked_usd - expected_cap * 0.15).abs() < 1e-3);
        assert_eq!(snapshot.last_updated, test_start());
    }

    #[test]
    fn parses_holding_arguments() {
        assert_eq!("eth=2.5".parse::<Holding>().unwrap(), Holding::new("eth", 2.5));
        assert!("ETH".parse::<Holding>().is_err());
        assert!("=3".parse::<Holding>().is_err());
        assert!("ETH=lots".parse::<Holding>().is_err());
        assert_eq!("BTC= 0 ".parse::<Holding>().unwrap(), Holding::new("BTC", 0.0));
    }

    #[test]
    fn rejects_non_finite_or_negative_amounts() {
        for arg in ["ETH=NaN", "ETH=inf", "ETH=-infinity", "ETH=-2"] {
            assert!(arg.parse::<Holding>().is_err(), "accepted {arg}");
        }
    }
}
