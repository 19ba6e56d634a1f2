use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use ethers::providers::{Provider, Http};
use eyre::{Result, eyre};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::constants::{DEFAULT_ETHEREUM_RPC_URL, DEFAULT_PRICE_CACHE_TTL_SECS, DEFAULT_RPC_TIMEOUT_SECS};
use crate::pricing::feed_registry::FeedRegistry;

pub struct Config {
    pub ethereum_provider: Arc<Provider<Http>>,
    pub network_mode: String,
    pub price_cache_ttl: Duration,
    pub feed_registry: Arc<FeedRegistry>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let lookup = |key: &str| env::var(key).ok();

        let network_mode = lookup("NETWORK_MODE").unwrap_or_else(|| "prod".to_string());
        let rpc_url = rpc_url_for_mode(&network_mode, lookup)?;
        let rpc_timeout_secs = parse_u64_setting("RPC_TIMEOUT_SECS", lookup("RPC_TIMEOUT_SECS"), DEFAULT_RPC_TIMEOUT_SECS)?;
        let ttl_secs = parse_u64_setting("PRICE_CACHE_TTL_SECS", lookup("PRICE_CACHE_TTL_SECS"), DEFAULT_PRICE_CACHE_TTL_SECS)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(rpc_timeout_secs))
            .build()?;
        let provider = Provider::new(Http::new_with_client(Url::parse(&rpc_url)?, http_client));

        let feed_registry = match env::var("PRICE_FEEDS_FILE") {
            Ok(path) => {
                info!(file = %path, "Loading price feeds from file");
                FeedRegistry::load_from_file(&path)?
            }
            Err(_) => FeedRegistry::mainnet_defaults()?,
        };

        debug!(
            network_mode = %network_mode,
            rpc_timeout_secs,
            ttl_secs,
            feed_count = feed_registry.num_feeds(),
            "Configuration loaded"
        );

        Ok(Config {
            ethereum_provider: Arc::new(provider),
            network_mode,
            price_cache_ttl: Duration::from_secs(ttl_secs),
            feed_registry: Arc::new(feed_registry),
        })
    }
}

/// Mode-specific RPC url, then the generic one, then the public default
fn rpc_url_for_mode(network_mode: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let url = match network_mode {
        "test" => lookup("ETHEREUM_RPC_URL_TEST").or_else(|| lookup("ETHEREUM_RPC_URL")),
        "prod" => lookup("ETHEREUM_RPC_URL_PROD").or_else(|| lookup("ETHEREUM_RPC_URL")),
        other => return Err(eyre!("Invalid NETWORK_MODE value '{}' (must be 'test' or 'prod')", other)),
    };
    Ok(url.unwrap_or_else(|| DEFAULT_ETHEREUM_RPC_URL.to_string()))
}

fn parse_u64_setting(key: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| eyre!("Invalid {} value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
