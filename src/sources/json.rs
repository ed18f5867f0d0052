//! JSON file source — threads exported by another tool, or test fixtures.
//!
//! The file holds a JSON array of threads. Fields may be missing; scoring
//! fills in defaults.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::scoring::types::Thread;
use crate::sources::ThreadSource;

/// Reads threads from a JSON file.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parse a JSON array of threads.
pub fn parse_threads(raw: &str) -> Result<Vec<Thread>, SourceError> {
    let threads: Vec<Thread> = serde_json::from_str(raw)?;
    if let Some(position) = threads.iter().position(|t| t.id.trim().is_empty()) {
        return Err(SourceError::InvalidData(format!(
            "thread at index {position} has no id"
        )));
    }
    Ok(threads)
}

#[async_trait]
impl ThreadSource for JsonFileSource {
    fn name(&self) -> &str {
        "json"
    }

    async fn fetch_threads(
        &self,
        days_back: u32,
        max_results: usize,
    ) -> Result<Vec<Thread>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut threads = parse_threads(&raw)?;

        let total = threads.len();
        threads.retain(|t| t.days_ago.is_none_or(|days| days <= days_back));
        if threads.len() < total {
            debug!(
                dropped = total - threads.len(),
                days_back,
                "Dropped threads outside the fetch window"
            );
        }

        if threads.len() > max_results {
            warn!(
                available = threads.len(),
                max_results, "Thread file exceeds max results, truncating"
            );
            threads.truncate(max_results);
        }

        Ok(threads)
    }
}
