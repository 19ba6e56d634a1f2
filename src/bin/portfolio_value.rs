use dotenvy::dotenv;
use eyre::{Result, eyre};
use tracing::{info, error};

use hotel_price_oracle::config;
use hotel_price_oracle::logging;
use hotel_price_oracle::pricing::PriceCache;
use hotel_price_oracle::pricing::market_data::Holding;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if present
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    // Holdings are given as SYMBOL=AMOUNT arguments, e.g. `portfolio_value ETH=2 BTC=0.1`
    let holdings = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<Holding>())
        .collect::<Result<Vec<_>>>()?;
    if holdings.is_empty() {
        return Err(eyre!("Usage: portfolio_value SYMBOL=AMOUNT [SYMBOL=AMOUNT ...]"));
    }

    let cfg = config::Config::load()?;
    info!(network_mode = %cfg.network_mode, holding_count = holdings.len(), "Configuration loaded and logging initialized");

    let price_cache = PriceCache::from_config(&cfg);

    let valuation = match price_cache.calculate_portfolio_value(&holdings).await {
        Ok(valuation) => valuation,
        Err(e) => {
            error!(error = %e, "Failed to value portfolio");
            return Err(e.into());
        }
    };

    for line in &valuation.breakdown {
        println!(
            "{:<6} {:>14.6} x ${:>12.4} = ${:>16.2}",
            line.symbol, line.amount, line.unit_price_usd, line.total_usd
        );
    }
    let total_eth = price_cache.convert_usd_to_eth(valuation.total_usd).await?;
    println!("Total: ${:.2} ({:.6} ETH)", valuation.total_usd, total_eth);

    Ok(())
}
