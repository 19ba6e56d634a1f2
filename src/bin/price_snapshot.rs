use dotenvy::dotenv;
use eyre::Result;
use tracing::info;

use hotel_price_oracle::config;
use hotel_price_oracle::logging;
use hotel_price_oracle::pricing::PriceCache;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if present
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    // Load configuration (including provider and feed registry)
    let cfg = config::Config::load()?;
    info!(network_mode = %cfg.network_mode, "Configuration loaded and logging initialized");

    let price_cache = PriceCache::from_config(&cfg);
    info!(
        ttl_secs = price_cache.ttl().as_secs(),
        symbols = ?price_cache.registry().symbols(),
        "Price cache initialized"
    );

    // Symbols on the command line are fetched as one batch, otherwise print the market snapshot
    let symbols: Vec<String> = std::env::args().skip(1).collect();
    if symbols.is_empty() {
        let snapshot = price_cache.get_market_data().await?;
        println!("{}", snapshot);
    } else {
        for quote in price_cache.get_multiple_prices(&symbols).await? {
            println!("{:<6} ${:>14.4}  ({:?}, observed {})", quote.symbol, quote.price, quote.origin, quote.observed_at.to_rfc3339());
        }
    }

    let one_eth_usd = price_cache.convert_eth_to_usd(1.0).await?;
    info!(one_eth_usd, "ETH conversion rate");

    for cached in price_cache.cached_prices().await {
        info!(
            symbol = %cached.symbol,
            price = cached.price,
            origin = ?cached.origin,
            cached_at = %cached.cached_at,
            "Cached price"
        );
    }

    Ok(())
}
