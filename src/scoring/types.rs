//! Shared types for the scoring pipeline.

use serde::{Deserialize, Serialize};

/// Characters of the latest message kept for display.
pub const PREVIEW_CHARS: usize = 500;

// ── Thread ──────────────────────────────────────────────────────────

/// A conversation thread as delivered by a thread source.
///
/// Scored as a unit using its most recent message. Every field except the
/// identifier may be missing; scoring falls back to safe defaults instead
/// of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thread {
    /// Provider thread identifier.
    pub id: String,
    /// Display name of the latest message's sender.
    #[serde(alias = "from")]
    pub sender_name: String,
    /// Address of the latest message's sender (lowercased).
    #[serde(alias = "email")]
    pub sender_email: String,
    pub subject: String,
    /// Normalized text of the latest message.
    #[serde(alias = "lastMessage")]
    pub body: Option<String>,
    /// Whole days since the latest message was sent.
    #[serde(alias = "daysAgo")]
    pub days_ago: Option<u32>,
    /// Number of messages in the thread.
    #[serde(alias = "messageCount")]
    pub message_count: Option<u32>,
    #[serde(alias = "isRead")]
    pub is_read: bool,
}

impl Thread {
    /// Latest message text, empty when absent.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// Days elapsed; a missing timestamp counts as fresh.
    pub fn days_elapsed(&self) -> u32 {
        self.days_ago.unwrap_or(0)
    }

    /// Message count; missing or zero counts as a single message.
    pub fn messages(&self) -> u32 {
        self.message_count.unwrap_or(1).max(1)
    }
}

// ── Scored result ───────────────────────────────────────────────────

/// A thread with its needs-reply score and the reasons behind it.
///
/// Serializes with the field names the JSON export uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredThread {
    pub id: String,
    #[serde(rename = "from")]
    pub sender_name: String,
    #[serde(rename = "email")]
    pub sender_email: String,
    pub subject: String,
    pub last_message: String,
    pub days_ago: u32,
    pub message_count: u32,
    pub is_read: bool,
    /// Always within [0, 100].
    pub score: u8,
    /// In the order the contributing signals were evaluated.
    pub reasons: Vec<String>,
}

impl ScoredThread {
    pub fn new(thread: &Thread, score: u8, reasons: Vec<String>) -> Self {
        Self {
            id: thread.id.clone(),
            sender_name: thread.sender_name.clone(),
            sender_email: thread.sender_email.clone(),
            subject: thread.subject.clone(),
            last_message: preview(thread.body_text(), PREVIEW_CHARS),
            days_ago: thread.days_elapsed(),
            message_count: thread.messages(),
            is_read: thread.is_read,
            score,
            reasons,
        }
    }
}

/// Trim and truncate to `max_chars`, marking truncation with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", trimmed[..cut].trim_end()),
        None => trimmed.to_string(),
    }
}

// ── Result set ──────────────────────────────────────────────────────

/// Ranked scan output: filtered to the minimum score, highest score first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<ScoredThread>,
}

impl ResultSet {
    pub(crate) fn from_ranked(results: Vec<ScoredThread>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredThread> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[ScoredThread] {
        &self.results
    }

    /// Scores in result order.
    pub fn scores(&self) -> Vec<u8> {
        self.results.iter().map(|r| r.score).collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ScoredThread;
    type IntoIter = std::slice::Iter<'a, ScoredThread>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let thread: Thread = serde_json::from_str(r#"{"id": "t-1"}"#).unwrap();
        assert_eq!(thread.body_text(), "");
        assert_eq!(thread.days_elapsed(), 0);
        assert_eq!(thread.messages(), 1);
        assert!(!thread.is_read);
    }

    #[test]
    fn zero_message_count_counts_as_one() {
        let thread = Thread {
            message_count: Some(0),
            ..Thread::default()
        };
        assert_eq!(thread.messages(), 1);
    }

    #[test]
    fn thread_accepts_export_field_names() {
        let json = r#"{
            "id": "t-9",
            "from": "Alice",
            "email": "alice@example.com",
            "subject": "Lunch",
            "lastMessage": "Free on Friday?",
            "daysAgo": 3,
            "messageCount": 2,
            "isRead": true
        }"#;
        let thread: Thread = serde_json::from_str(json).unwrap();
        assert_eq!(thread.sender_name, "Alice");
        assert_eq!(thread.body_text(), "Free on Friday?");
        assert_eq!(thread.days_ago, Some(3));
        assert_eq!(thread.message_count, Some(2));
        assert!(thread.is_read);
    }

    #[test]
    fn scored_thread_serializes_export_keys() {
        let thread = Thread {
            id: "t-1".into(),
            sender_name: "Bob".into(),
            sender_email: "bob@example.com".into(),
            subject: "Report".into(),
            body: Some("Any update?".into()),
            days_ago: Some(16),
            message_count: Some(2),
            is_read: false,
        };
        let scored = ScoredThread::new(&thread, 75, vec!["Contains question".into()]);
        let json = serde_json::to_value(&scored).unwrap();

        assert_eq!(json["id"], "t-1");
        assert_eq!(json["from"], "Bob");
        assert_eq!(json["email"], "bob@example.com");
        assert_eq!(json["lastMessage"], "Any update?");
        assert_eq!(json["daysAgo"], 16);
        assert_eq!(json["messageCount"], 2);
        assert_eq!(json["isRead"], false);
        assert_eq!(json["score"], 75);
        assert_eq!(json["reasons"][0], "Contains question");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(PREVIEW_CHARS + 20);
        let short = preview(&body, PREVIEW_CHARS);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(preview("  hi there \n", PREVIEW_CHARS), "hi there");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll...");
    }

    #[test]
    fn result_set_serializes_as_array() {
        let set = ResultSet::default();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[]");
        assert!(set.is_empty());
    }
}
