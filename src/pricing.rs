pub mod quote;
pub mod error;
pub mod clock;
pub mod feed_registry;
pub mod fallback;
pub mod oracle_client;
pub mod price_cache;
pub mod market_data;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PriceError;
pub use quote::{CachedPrice, PriceOrigin, PriceQuote};
pub use price_cache::PriceCache;
