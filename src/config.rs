//! Configuration types.
//!
//! Everything the scan needs is carried in an explicit, immutable
//! [`ScanConfig`] passed into each call. Scoring weights live in
//! [`ScoringConfig`], which can be loaded from a JSON file so weights can be
//! tuned without rebuilding.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Default fetch window in days.
pub const DEFAULT_DAYS_BACK: u32 = 60;

/// Default number of threads fetched and considered.
pub const DEFAULT_MAX_RESULTS: usize = 150;

/// Default minimum score for a thread to be reported.
pub const DEFAULT_MIN_SCORE: i32 = 20;

// ── Scoring configuration ───────────────────────────────────────────

/// A keyword/phrase whose presence in the latest message adds points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPhrase {
    pub phrase: String,
    pub points: i32,
}

impl ActionPhrase {
    pub fn new(phrase: &str, points: i32) -> Self {
        Self {
            phrase: phrase.to_string(),
            points,
        }
    }
}

/// Staleness tier: applies when the thread is strictly older than `min_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeTier {
    pub min_days: u32,
    pub points: i32,
    pub reason: String,
}

/// Thread length tier: applies when the message count meets `min_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthTier {
    pub min_messages: u32,
    pub points: i32,
    pub reason: String,
}

/// How many action phrases may contribute to a single score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseMatching {
    /// Every matching phrase contributes independently.
    #[default]
    All,
    /// Only the first matching phrase (in table order) contributes.
    FirstOnly,
}

/// Scoring weights and thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points for a question mark anywhere in the latest message.
    pub question_points: i32,
    /// Ordered action-phrase table. Evaluated in this order.
    pub action_phrases: Vec<ActionPhrase>,
    pub phrase_matching: PhraseMatching,
    /// Ascending by `min_days`; the largest tier exceeded applies.
    pub age_tiers: Vec<AgeTier>,
    /// Ascending by `min_messages`; the largest tier met applies. The last
    /// tier is the long-thread signal.
    pub length_tiers: Vec<LengthTier>,
    /// Closing tokens that mark a message as already wrapped up.
    pub close_phrases: Vec<String>,
    /// Points subtracted when the message ends with a closing token.
    pub courtesy_close_penalty: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let action_phrases = [
            ("let me know", 25),
            ("thoughts?", 30),
            ("what do you think", 28),
            ("can you", 20),
            ("could you", 20),
            ("would you", 18),
            ("please", 10),
            ("asap", 35),
            ("urgent", 35),
            ("waiting", 25),
            ("get back to me", 30),
            ("reply", 25),
            ("respond", 25),
            ("following up", 30),
            ("checking in", 25),
            ("any update", 30),
            ("free to", 15),
            ("available", 12),
            ("when can", 22),
        ]
        .into_iter()
        .map(|(phrase, points)| ActionPhrase::new(phrase, points))
        .collect();

        Self {
            question_points: 30,
            action_phrases,
            phrase_matching: PhraseMatching::All,
            age_tiers: vec![
                AgeTier {
                    min_days: 7,
                    points: 10,
                    reason: "Over a week old".into(),
                },
                AgeTier {
                    min_days: 14,
                    points: 15,
                    reason: "Over 2 weeks old".into(),
                },
                AgeTier {
                    min_days: 30,
                    points: 25,
                    reason: "Over a month old".into(),
                },
            ],
            length_tiers: vec![
                LengthTier {
                    min_messages: 3,
                    points: 8,
                    reason: "Active thread".into(),
                },
                LengthTier {
                    min_messages: 5,
                    points: 15,
                    reason: "Long thread".into(),
                },
            ],
            close_phrases: ["thanks", "thank you", "cheers", "best", "regards"]
                .into_iter()
                .map(String::from)
                .collect(),
            courtesy_close_penalty: 15,
        }
    }
}

impl ScoringConfig {
    /// Load scoring weights from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ConfigError::ParseError(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        debug!(
            path = %path.display(),
            phrases = config.action_phrases.len(),
            "Loaded scoring config"
        );
        Ok(config)
    }

    /// Reject tables the extractor cannot evaluate deterministically.
    ///
    /// An empty action-phrase table is valid and contributes nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(entry) = self
            .action_phrases
            .iter()
            .find(|a| a.phrase.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "action_phrases",
                format!("empty phrase (points {})", entry.points),
            ));
        }

        if self
            .age_tiers
            .windows(2)
            .any(|w| w[0].min_days >= w[1].min_days)
        {
            return Err(ConfigError::invalid(
                "age_tiers",
                "thresholds must be strictly ascending",
            ));
        }

        if self
            .length_tiers
            .windows(2)
            .any(|w| w[0].min_messages >= w[1].min_messages)
        {
            return Err(ConfigError::invalid(
                "length_tiers",
                "thresholds must be strictly ascending",
            ));
        }

        if self.close_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid("close_phrases", "empty closing phrase"));
        }

        if self.courtesy_close_penalty < 0 {
            return Err(ConfigError::invalid(
                "courtesy_close_penalty",
                format!(
                    "must be non-negative, got {}",
                    self.courtesy_close_penalty
                ),
            ));
        }

        Ok(())
    }
}

// ── Scan configuration ──────────────────────────────────────────────

/// Full scan configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upstream fetch window. Not used by scoring.
    pub days_back: u32,
    /// Cap on threads fetched and scored. Applied before filtering.
    pub max_results: usize,
    /// Inclusive lower bound on reported scores.
    pub min_score: i32,
    /// The mailbox owner's address. Threads they replied to last are skipped.
    pub user_address: Option<String>,
    pub scoring: ScoringConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            days_back: DEFAULT_DAYS_BACK,
            max_results: DEFAULT_MAX_RESULTS,
            min_score: DEFAULT_MIN_SCORE,
            user_address: None,
            scoring: ScoringConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Build config from environment variables.
    ///
    /// - `REPLY_SCAN_DAYS_BACK` (default 60)
    /// - `REPLY_SCAN_MAX_RESULTS` (default 150)
    /// - `REPLY_SCAN_MIN_SCORE` (default 20)
    /// - `REPLY_SCAN_USER_ADDRESS` (optional, falls back to `EMAIL_USERNAME`
    ///   when that is an address)
    /// - `REPLY_SCAN_SCORING_FILE` (optional JSON scoring weights)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let days_back = parse_var(&lookup, "REPLY_SCAN_DAYS_BACK", DEFAULT_DAYS_BACK)?;
        let max_results = parse_var(&lookup, "REPLY_SCAN_MAX_RESULTS", DEFAULT_MAX_RESULTS)?;
        let min_score = parse_var(&lookup, "REPLY_SCAN_MIN_SCORE", DEFAULT_MIN_SCORE)?;

        let user_address = lookup("REPLY_SCAN_USER_ADDRESS")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                lookup("EMAIL_USERNAME")
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| s.contains('@'))
            });

        let scoring = match lookup("REPLY_SCAN_SCORING_FILE").filter(|s| !s.trim().is_empty()) {
            Some(path) => ScoringConfig::from_file(Path::new(path.trim()))?,
            None => ScoringConfig::default(),
        };

        let config = Self {
            days_back,
            max_results,
            min_score,
            user_address,
            scoring,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid settings before any fetching starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_score < 0 {
            return Err(ConfigError::invalid(
                "REPLY_SCAN_MIN_SCORE",
                format!("must be non-negative, got {}", self.min_score),
            ));
        }
        if self.min_score > 100 {
            warn!(
                min_score = self.min_score,
                "Minimum score above 100; no thread can be reported"
            );
        }
        if self.max_results == 0 {
            return Err(ConfigError::invalid(
                "REPLY_SCAN_MAX_RESULTS",
                "must be at least 1",
            ));
        }
        if self.days_back == 0 {
            return Err(ConfigError::invalid(
                "REPLY_SCAN_DAYS_BACK",
                "must be at least 1",
            ));
        }
        self.scoring.validate()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, format!("{e} ({raw:?})"))),
        _ => Ok(default),
    }
}
