//! Inbox scan — the crate's outward contract.
//!
//! Flow:
//! 1. Cap to `max_results` threads (fetch order)
//! 2. `SenderFilter::evaluate()`: drop replied/automated threads
//! 3. `score_thread()`: per-thread, independent
//! 4. `rank()`: minimum score, descending

pub mod filter;

use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::scoring::{ResultSet, ScoredThread, Thread, rank, score_thread};
use crate::sources::ThreadSource;

pub use filter::{SenderFilter, SkipReason};

/// Score and rank threads with the default sender filter.
pub fn scan(threads: Vec<Thread>, config: &ScanConfig) -> ResultSet {
    let filter = SenderFilter::default_rules(config.user_address.as_deref());
    scan_with_filter(threads, config, &filter)
}

/// Score and rank threads with a caller-supplied sender filter.
pub fn scan_with_filter(
    threads: Vec<Thread>,
    config: &ScanConfig,
    filter: &SenderFilter,
) -> ResultSet {
    let fetched = threads.len();
    let considered = fetched.min(config.max_results);

    let mut skipped = 0_usize;
    let scored: Vec<ScoredThread> = threads
        .iter()
        .take(config.max_results)
        .filter(|thread| match filter.evaluate(thread) {
            Some(reason) => {
                debug!(id = %thread.id, ?reason, "Skipping thread");
                skipped += 1;
                false
            }
            None => true,
        })
        .map(|thread| score_thread(thread, &config.scoring))
        .collect();

    let results = rank(&scored, config.min_score);

    info!(
        fetched,
        considered,
        skipped,
        scored = scored.len(),
        reported = results.len(),
        min_score = config.min_score,
        "Scan complete"
    );

    results
}

/// Fetch threads from a source and scan them.
pub async fn scan_source(
    source: &dyn ThreadSource,
    config: &ScanConfig,
) -> Result<ResultSet> {
    info!(
        source = source.name(),
        days_back = config.days_back,
        max_results = config.max_results,
        "Fetching threads"
    );
    let threads = source
        .fetch_threads(config.days_back, config.max_results)
        .await?;
    info!(source = source.name(), count = threads.len(), "Threads fetched");
    Ok(scan(threads, config))
}
