//! Thread sources — where scanned threads come from.
//!
//! Sources are pure I/O: they deliver normalized `Thread`s (latest message
//! text, days elapsed, message count) and leave scoring to the scan.

pub mod imap;
pub mod json;
pub mod threading;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::scoring::types::Thread;

pub use imap::{ImapConfig, ImapSource};
pub use json::JsonFileSource;

/// Trait for thread sources.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// Source name (e.g. "imap", "json").
    fn name(&self) -> &str;

    /// Fetch up to `max_results` threads active in the last `days_back` days,
    /// in fetch order.
    async fn fetch_threads(
        &self,
        days_back: u32,
        max_results: usize,
    ) -> Result<Vec<Thread>, SourceError>;
}
