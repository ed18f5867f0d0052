//! Scorer — folds a signal set into a bounded score with reasons.

use crate::config::ScoringConfig;
use crate::scoring::signals::{AgeBucket, SignalSet, extract_signals};
use crate::scoring::types::{ScoredThread, Thread};

/// Upper bound of every score.
pub const MAX_SCORE: i32 = 100;

pub const QUESTION_REASON: &str = "Contains question";
pub const COURTESY_CLOSE_REASON: &str = "Has closing phrase (lower priority)";

/// A clamped score and the reasons that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Within [0, 100].
    pub value: u8,
    /// Raw, unclamped total. Useful when tuning weights.
    pub raw: i32,
    /// Evaluation order; never trimmed by clamping.
    pub reasons: Vec<String>,
}

/// Combine signals in fixed order: question, action phrases (table order),
/// age bucket, thread length, courtesy close.
pub fn score_signals(signals: &SignalSet, config: &ScoringConfig) -> Score {
    let mut total: i32 = 0;
    let mut reasons = Vec::new();

    if signals.has_question {
        total = total.saturating_add(config.question_points);
        reasons.push(QUESTION_REASON.to_string());
    }

    for action in &signals.action_matches {
        total = total.saturating_add(action.points);
        reasons.push(action.reason());
    }

    if let AgeBucket::Aged(tier) = &signals.age_bucket {
        total = total.saturating_add(tier.points);
        reasons.push(tier.reason.clone());
    }

    if let Some(tier) = &signals.thread_length {
        total = total.saturating_add(tier.points);
        reasons.push(tier.reason.clone());
    }

    if signals.has_courtesy_close {
        total = total.saturating_sub(config.courtesy_close_penalty);
        reasons.push(COURTESY_CLOSE_REASON.to_string());
    }

    Score {
        value: clamp_score(total),
        raw: total,
        reasons,
    }
}

/// Clamp a raw total into [0, 100].
pub fn clamp_score(raw: i32) -> u8 {
    // Bounded to 0..=100 so the cast is lossless
    raw.clamp(0, MAX_SCORE) as u8
}

/// Extract signals for a thread and score them.
pub fn score_thread(thread: &Thread, config: &ScoringConfig) -> ScoredThread {
    let signals = extract_signals(thread, config);
    let score = score_signals(&signals, config);
    ScoredThread::new(thread, score.value, score.reasons)
}
