//! Signal extraction — derives discrete facts about a thread's latest message.
//!
//! Pure pattern matching over lowercased text. Nothing here can fail: an
//! absent body is matched as the empty string, a missing timestamp is fresh.

use crate::config::{AgeTier, LengthTier, PhraseMatching, ScoringConfig};
use crate::scoring::types::Thread;

/// An action phrase found in the latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    pub phrase: String,
    pub points: i32,
}

impl ActionMatch {
    pub fn reason(&self) -> String {
        format!("Contains \"{}\"", self.phrase)
    }
}

/// Staleness classification. Only one tier ever applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgeBucket {
    Fresh,
    Aged(AgeTier),
}

/// Derived facts about one thread, in scoring order.
///
/// Built once per thread by [`extract_signals`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    pub has_question: bool,
    /// In action-table order, one entry per distinct phrase.
    pub action_matches: Vec<ActionMatch>,
    pub age_bucket: AgeBucket,
    /// Largest length tier met, if any. The top tier is the long-thread
    /// signal.
    pub thread_length: Option<LengthTier>,
    pub has_courtesy_close: bool,
}

impl SignalSet {
    /// Whether any signal fired at all.
    pub fn is_empty(&self) -> bool {
        !self.has_question
            && self.action_matches.is_empty()
            && self.age_bucket == AgeBucket::Fresh
            && self.thread_length.is_none()
            && !self.has_courtesy_close
    }
}

/// Derive the signal set for a thread.
pub fn extract_signals(thread: &Thread, config: &ScoringConfig) -> SignalSet {
    let body = thread.body_text();
    let body_lower = body.to_lowercase();
    let messages = thread.messages();

    let thread_length = length_tier(messages, &config.length_tiers).cloned();

    SignalSet {
        has_question: body.contains('?'),
        action_matches: match_action_phrases(&body_lower, config),
        age_bucket: age_bucket(thread.days_elapsed(), &config.age_tiers),
        thread_length,
        has_courtesy_close: ends_with_courtesy_close(&body_lower, &config.close_phrases),
    }
}

fn match_action_phrases(body_lower: &str, config: &ScoringConfig) -> Vec<ActionMatch> {
    let mut matches: Vec<ActionMatch> = Vec::new();
    if body_lower.is_empty() {
        return matches;
    }

    for entry in &config.action_phrases {
        let phrase = entry.phrase.trim().to_lowercase();
        if !body_lower.contains(&phrase) {
            continue;
        }
        // Same phrase listed twice yields the same reason; count it once.
        if matches.iter().any(|m| m.phrase == phrase) {
            continue;
        }
        matches.push(ActionMatch {
            phrase,
            points: entry.points,
        });
        if config.phrase_matching == PhraseMatching::FirstOnly {
            break;
        }
    }

    matches
}

/// Largest tier strictly exceeded by `days`.
pub fn age_bucket(days: u32, tiers: &[AgeTier]) -> AgeBucket {
    tiers
        .iter()
        .rev()
        .find(|tier| days > tier.min_days)
        .map_or(AgeBucket::Fresh, |tier| AgeBucket::Aged(tier.clone()))
}

fn length_tier(messages: u32, tiers: &[LengthTier]) -> Option<&LengthTier> {
    tiers.iter().rev().find(|tier| messages >= tier.min_messages)
}

/// Suffix match against closing tokens, ignoring trailing whitespace and
/// punctuation ("Thanks!", "thank you.\n", "Cheers,").
pub fn ends_with_courtesy_close(body_lower: &str, close_phrases: &[String]) -> bool {
    let trimmed = trim_trailing(body_lower);
    if trimmed.is_empty() {
        return false;
    }
    close_phrases.iter().any(|phrase| {
        let token = phrase.to_lowercase();
        let token = trim_trailing(token.trim_start());
        !token.is_empty() && trimmed.ends_with(token)
    })
}

fn trim_trailing(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
}
