use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::str::FromStr;
use ethers::types::Address;
use eyre::{Result, eyre};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::constants::{DEFAULT_FALLBACK_PRICES, MAINNET_PRICE_FEEDS};

/// Canonical cache/registry key for a symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[derive(Debug, Deserialize)]
struct FeedFile {
    feeds: Vec<FeedFileEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedFileEntry {
    symbol: String,
    address: Option<String>,
    fallback_price: Option<f64>,
}

/// Symbol → Chainlink feed address and symbol → static fallback price
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    feeds: HashMap<String, Address>,
    fallback_prices: HashMap<String, f64>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ethereum mainnet feeds with the stock fallback table
    pub fn mainnet_defaults() -> Result<Self> {
        let mut registry = Self::new();
        for (symbol, address) in MAINNET_PRICE_FEEDS {
            registry.feeds.insert(symbol.to_string(), Address::from_str(address)?);
        }
        for (symbol, price) in DEFAULT_FALLBACK_PRICES {
            registry = registry.with_fallback(symbol, price)?;
        }
        Ok(registry)
    }

    #[instrument(fields(on_close = true))]
    pub fn load_from_file(path: &str) -> Result<Self> {
        let file_content = fs::read_to_string(path)?;
        let registry = Self::from_json_str(&file_content)?;
        info!(
            feed_count = registry.num_feeds(),
            fallback_count = registry.fallback_prices.len(),
            "Price feeds loaded from file"
        );
        Ok(registry)
    }

    /// Parses `{"feeds": [{"symbol", "address"?, "fallbackPrice"?}]}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: FeedFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for entry in file.feeds {
            let symbol = normalize_symbol(&entry.symbol);
            if symbol.is_empty() {
                return Err(eyre!("Feed entry with empty symbol"));
            }
            if entry.address.is_none() && entry.fallback_price.is_none() {
                return Err(eyre!("Feed entry {} has neither an address nor a fallback price", symbol));
            }
            if let Some(address) = entry.address {
                let address = Address::from_str(&address)
                    .map_err(|e| eyre!("Invalid feed address for {}: {}", symbol, e))?;
                registry.feeds.insert(symbol.clone(), address);
            }
            if let Some(price) = entry.fallback_price {
                registry = registry.with_fallback(&symbol, price)?;
            }
            debug!(symbol = %symbol, "Loaded feed entry");
        }
        Ok(registry)
    }

    pub fn with_feed(mut self, symbol: &str, address: Address) -> Self {
        self.feeds.insert(normalize_symbol(symbol), address);
        self
    }

    /// Fallback prices must be finite and positive
    pub fn with_fallback(mut self, symbol: &str, price: f64) -> Result<Self> {
        let symbol = normalize_symbol(symbol);
        if !price.is_finite() || price <= 0.0 {
            return Err(eyre!("Invalid fallback price for {}: {}", symbol, price));
        }
        self.fallback_prices.insert(symbol, price);
        Ok(self)
    }

    pub fn feed_address(&self, symbol: &str) -> Option<Address> {
        self.feeds.get(&normalize_symbol(symbol)).copied()
    }

    pub fn fallback_price(&self, symbol: &str) -> Option<f64> {
        self.fallback_prices.get(&normalize_symbol(symbol)).copied()
    }

    pub fn is_known(&self, symbol: &str) -> bool {
        self.feed_address(symbol).is_some() || self.fallback_price(symbol).is_some()
    }

    pub fn num_feeds(&self) -> usize {
        self.feeds.len()
    }

    /// Every symbol with a feed or a fallback price, sorted
    pub fn symbols(&self) -> Vec<String> {
        self.feeds
            .keys()
            .chain(self.fallback_prices.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
