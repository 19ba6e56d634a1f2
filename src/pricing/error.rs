use thiserror::Error;

/// Failures surfaced by the price lookup path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Symbol has neither a registered feed nor a fallback price
    #[error("No price feed or fallback price registered for {0}")]
    UnsupportedSymbol(String),

    /// Feed read failed (network, timeout, revert, or an invalid answer)
    #[error("Oracle price unavailable for {symbol}: {reason}")]
    OracleUnavailable { symbol: String, reason: String },

    /// Oracle failed and the fallback table has no entry for the symbol
    #[error("No fallback price available for {0}")]
    NoFallback(String),
}

impl PriceError {
    pub fn oracle_unavailable(symbol: &str, reason: impl ToString) -> Self {
        PriceError::OracleUnavailable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}
