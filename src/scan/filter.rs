//! Pre-scoring sender filter.
//!
//! Drops threads that cannot need a reply before they are scored:
//! - the mailbox owner sent the latest message (already replied)
//! - noreply/no-reply senders
//! - notification bots
//! - mailer-daemon bounces

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::scoring::types::Thread;

/// A sender pattern that marks a thread as automated.
#[derive(Debug, Clone)]
pub struct SenderRule {
    /// Human-readable pattern description.
    pub pattern: String,
    /// Compiled regex, matched against the sender address.
    pub regex: Regex,
    /// Why this rule triggers.
    pub reason: String,
}

/// Why a thread was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The mailbox owner sent the latest message.
    RepliedByUser,
    /// Automated sender matched a rule.
    Automated(String),
}

/// Sender filter applied to every fetched thread.
#[derive(Debug, Clone)]
pub struct SenderFilter {
    user_address: Option<String>,
    rules: Vec<SenderRule>,
}

impl SenderFilter {
    /// Filter with the default automated-sender rules.
    pub fn default_rules(user_address: Option<&str>) -> Self {
        let rules = vec![
            SenderRule {
                pattern: "noreply".into(),
                regex: Regex::new(r"(?i)no[\-_.]?reply").unwrap(),
                reason: "noreply sender".into(),
            },
            SenderRule {
                pattern: "notifications".into(),
                regex: Regex::new(r"(?i)notifications").unwrap(),
                reason: "notification sender".into(),
            },
            SenderRule {
                pattern: "mailer-daemon".into(),
                regex: Regex::new(r"(?i)mailer[\-_]?daemon").unwrap(),
                reason: "automated mail system".into(),
            },
        ];

        Self {
            user_address: normalize_address(user_address),
            rules,
        }
    }

    /// Filter with no automated-sender rules.
    pub fn empty(user_address: Option<&str>) -> Self {
        Self {
            user_address: normalize_address(user_address),
            rules: Vec::new(),
        }
    }

    /// Add a custom automated-sender rule.
    pub fn add_rule(&mut self, pattern: &str, reason: &str) -> Result<(), ConfigError> {
        let regex = Regex::new(pattern)
            .map_err(|e| ConfigError::invalid("sender_rules", format!("{pattern}: {e}")))?;
        self.rules.push(SenderRule {
            pattern: pattern.into(),
            regex,
            reason: reason.into(),
        });
        Ok(())
    }

    /// Returns `Some(reason)` when the thread should not be scored.
    pub fn evaluate(&self, thread: &Thread) -> Option<SkipReason> {
        let sender = thread.sender_email.trim();

        if let Some(ref me) = self.user_address
            && sender.eq_ignore_ascii_case(me)
        {
            debug!(id = %thread.id, "Latest message is ours, skipping");
            return Some(SkipReason::RepliedByUser);
        }

        for rule in &self.rules {
            if rule.regex.is_match(sender) {
                debug!(
                    id = %thread.id,
                    sender = %sender,
                    rule = %rule.pattern,
                    reason = %rule.reason,
                    "Thread matched sender rule"
                );
                return Some(SkipReason::Automated(rule.reason.clone()));
            }
        }

        None
    }
}

fn normalize_address(address: Option<&str>) -> Option<String> {
    address
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
}
