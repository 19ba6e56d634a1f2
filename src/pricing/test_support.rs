use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use chrono::{DateTime, TimeZone, Utc};
use ethers::types::{Address, I256, U256};
use eyre::eyre;

use super::oracle_client::{FeedTransport, RoundData};

pub const FEED_UPDATED_AT_SECS: i64 = 1_714_564_800;

/// Deterministic feed address for tests
pub fn feed(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// In-memory feed contract with a failure switch and a call counter. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    answers: HashMap<Address, (i128, u8)>,
    failing: Arc<AtomicBool>,
    round_data_calls: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, feed: Address, answer: i128, decimals: u8) -> Self {
        self.answers.insert(feed, (answer, decimals));
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `latestRoundData` reads attempted, failed ones included
    pub fn round_data_calls(&self) -> usize {
        self.round_data_calls.load(Ordering::SeqCst)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(FEED_UPDATED_AT_SECS, 0).unwrap()
    }

    fn answer(&self, feed: Address) -> eyre::Result<(i128, u8)> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(eyre!("execution reverted"));
        }
        self.answers
            .get(&feed)
            .copied()
            .ok_or_else(|| eyre!("no contract code at {:?}", feed))
    }
}

impl FeedTransport for ScriptedTransport {
    async fn latest_round_data(&self, feed: Address) -> eyre::Result<RoundData> {
        self.round_data_calls.fetch_add(1, Ordering::SeqCst);
        let (answer, _) = self.answer(feed)?;
        Ok(RoundData {
            round_id: 42,
            answer: I256::from(answer),
            started_at: U256::from(FEED_UPDATED_AT_SECS as u64),
            updated_at: U256::from(FEED_UPDATED_AT_SECS as u64),
            answered_in_round: 42,
        })
    }

    async fn decimals(&self, feed: Address) -> eyre::Result<u8> {
        let (_, decimals) = self.answer(feed)?;
        Ok(decimals)
    }
}
