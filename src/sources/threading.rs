//! Thread assembly — groups fetched messages into conversation threads.
//!
//! Pure helpers shared by mailbox sources: thread keys from
//! `References`/`In-Reply-To`, quote stripping, HTML stripping, and
//! days-elapsed computation. No I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::types::Thread;

/// One fetched message with the headers threading needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Message-ID header (angle brackets stripped).
    pub message_id: String,
    /// In-Reply-To header, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Message-IDs from the References header, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Sender display name, if the From header had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Sender address (lowercased).
    pub sender_email: String,
    pub subject: String,
    /// Decoded text body.
    pub body: String,
    /// Date header, if it parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// `\Seen` flag.
    pub is_seen: bool,
    /// Fetched from the sent mailbox.
    #[serde(default)]
    pub sent: bool,
}

impl MailMessage {
    /// Nearest thread ancestor named by the headers.
    ///
    /// First References entry (the root), else In-Reply-To (the parent),
    /// else the message's own ID. A parent may itself be a reply;
    /// [`group_into_threads`] resolves that transitively.
    pub fn thread_key(&self) -> &str {
        self.references
            .first()
            .or(self.in_reply_to.as_ref())
            .map(String::as_str)
            .unwrap_or(self.message_id.as_str())
    }
}

/// Group messages into threads, newest thread first, at most `max_threads`.
///
/// Messages are visited oldest first so a reply's parent is keyed before
/// the reply: an `In-Reply-To` chain A <- B <- C lands in one thread rooted
/// at A. Duplicate Message-IDs (a message in both inbox and sent) count
/// once. Threads made only of sent messages are dropped. Each thread is
/// described by its latest message; `now` anchors days elapsed.
pub fn group_into_threads(
    mut messages: Vec<MailMessage>,
    now: DateTime<Utc>,
    max_threads: usize,
) -> Vec<Thread> {
    // Oldest first, undated last. Stable, so ties keep arrival order.
    messages.sort_by_key(|m| (m.date.is_none(), m.date));

    let mut root_of: HashMap<String, String> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<MailMessage>> = HashMap::new();

    for message in messages {
        let own_id = normalize_id(&message.message_id);
        if root_of.contains_key(&own_id) {
            debug!(id = %own_id, "Duplicate message, skipping");
            continue;
        }

        let hint = normalize_id(message.thread_key());
        let key = root_of.get(&hint).cloned().unwrap_or(hint);
        root_of.insert(own_id, key.clone());

        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(message);
    }

    let mut threads: Vec<(Option<DateTime<Utc>>, Thread)> = order
        .into_iter()
        .filter_map(|key| {
            let members = groups.remove(&key)?;
            if members.iter().all(|m| m.sent) {
                return None;
            }
            build_thread(key, members, now)
        })
        .collect();

    // Newest first; undated threads last.
    threads.sort_by(|(a, _), (b, _)| b.cmp(a));
    threads.truncate(max_threads);
    threads.into_iter().map(|(_, thread)| thread).collect()
}

fn build_thread(
    key: String,
    members: Vec<MailMessage>,
    now: DateTime<Utc>,
) -> Option<(Option<DateTime<Utc>>, Thread)> {
    let count = u32::try_from(members.len()).unwrap_or(u32::MAX);
    // max_by_key returns the last maximum, so undated messages fall back
    // to arrival order
    let latest = members.into_iter().max_by_key(|m| m.date)?;

    let body = strip_quoted_text(&latest.body);
    let sender_name = latest
        .sender_name
        .as_deref()
        .map(str::trim)
        .map(|name| name.trim_matches('"'))
        .filter(|name| !name.is_empty())
        .unwrap_or(latest.sender_email.as_str())
        .to_string();

    let thread = Thread {
        id: key,
        sender_name,
        sender_email: latest.sender_email.to_lowercase(),
        subject: if latest.subject.trim().is_empty() {
            "(No Subject)".to_string()
        } else {
            latest.subject.clone()
        },
        body: Some(body),
        days_ago: latest.date.map(|date| days_between(date, now)),
        message_count: Some(count),
        is_read: latest.is_seen,
    };

    Some((latest.date, thread))
}

/// Whole days from `then` to `now`, never negative.
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = now.signed_duration_since(then).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Strip angle brackets and whitespace from a message ID.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

/// Latest reply text of a message body, without quoted history.
///
/// Drops `>`-quoted lines and cuts at the first reply attribution
/// ("On ... wrote:"), forwarded/original-message separator or `-- `
/// signature delimiter.
pub fn strip_quoted_text(body: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in body.lines() {
        let t = line.trim();
        if t.starts_with('>') {
            continue;
        }
        if is_history_marker(t) || line == "-- " {
            break;
        }
        kept.push(line.trim_end());
    }

    while kept.last().is_some_and(|l| l.is_empty()) {
        kept.pop();
    }
    kept.join("\n")
}

fn is_history_marker(t: &str) -> bool {
    (t.starts_with("On ") && t.ends_with("wrote:"))
        || (t.starts_with("-----") && t.contains("Original Message"))
        || (t.starts_with("---") && t.contains("Forwarded message"))
        || t.starts_with("________________________________")
}

/// Plain text from an HTML body: tags dropped (with `<style>`/`<script>`
/// content), common entities decoded, whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = rest[open + 1..open + close].to_ascii_lowercase();
        rest = &rest[open + close + 1..];

        for skipped in ["style", "script"] {
            if tag.starts_with(skipped) {
                let end = format!("</{skipped}");
                rest = match rest.to_ascii_lowercase().find(&end) {
                    Some(idx) => &rest[idx..],
                    None => "",
                };
            }
        }
        // Tags separate words
        text.push(' ');
    }
    text.push_str(rest);

    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&amp;", "&"),
    ]
    .into_iter()
    .fold(text.to_string(), |acc, (entity, ch)| acc.replace(entity, ch))
}
