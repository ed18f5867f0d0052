//! Scan output — console report and JSON export.
//!
//! Both consume a `ResultSet` read-only.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::ReportError;
use crate::scoring::types::{ResultSet, ScoredThread};

/// Default export file name.
pub const DEFAULT_EXPORT_FILE: &str = "forgotten_replies.json";

/// Results shown in the console report.
pub const CONSOLE_LIMIT: usize = 20;

/// Reasons shown per result in the console report.
const REASONS_SHOWN: usize = 3;

/// Preview characters shown per result in the console report.
const PREVIEW_SHOWN: usize = 100;

/// How awkward the overdue reply is, by score.
pub fn awkwardness(score: u8) -> &'static str {
    match score {
        70..=u8::MAX => "😬",
        50..=69 => "😅",
        _ => "🤔",
    }
}

/// Render the top results for a terminal.
pub fn write_console<W: Write>(out: &mut W, results: &ResultSet) -> Result<(), ReportError> {
    let rule = "=".repeat(60);
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "🔴 EMAILS THAT PROBABLY NEED A REPLY")?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;

    if results.is_empty() {
        writeln!(out, "Nothing overdue. Inbox is in good shape.")?;
        return Ok(());
    }

    for result in results.iter().take(CONSOLE_LIMIT) {
        write_entry(out, result)?;
    }

    if results.len() > CONSOLE_LIMIT {
        writeln!(
            out,
            "... and {} more (see the JSON export)",
            results.len() - CONSOLE_LIMIT
        )?;
    }

    Ok(())
}

fn write_entry<W: Write>(out: &mut W, r: &ScoredThread) -> Result<(), ReportError> {
    let status = if r.is_read { "📭" } else { "📩 UNREAD" };
    let reasons = r
        .reasons
        .iter()
        .take(REASONS_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let preview: String = r.last_message.chars().take(PREVIEW_SHOWN).collect();

    writeln!(out, "{} Score: {}", awkwardness(r.score), r.score)?;
    writeln!(out, "   From: {} <{}>", r.sender_name, r.sender_email)?;
    writeln!(out, "   Subject: {}", r.subject)?;
    writeln!(
        out,
        "   {status} | {} days ago | {} messages",
        r.days_ago, r.message_count
    )?;
    writeln!(out, "   Why: {reasons}")?;
    writeln!(out, "   Preview: {preview}...")?;
    writeln!(out)?;
    Ok(())
}

/// Serialize results as pretty JSON.
pub fn to_json(results: &ResultSet) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Write the full result set to `path` as JSON.
pub fn export_json(results: &ResultSet, path: &Path) -> Result<(), ReportError> {
    let json = to_json(results)?;
    std::fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!(count = results.len(), path = %path.display(), "Exported results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::rank;

    fn scored(id: &str, score: u8, is_read: bool) -> ScoredThread {
        ScoredThread {
            id: id.into(),
            sender_name: "Alice".into(),
            sender_email: "alice@example.com".into(),
            subject: format!("Subject {id}"),
            last_message: "Can you take a look at the draft before Friday?".into(),
            days_ago: 12,
            message_count: 4,
            is_read,
            score,
            reasons: vec![
                "Contains question".into(),
                "Contains \"can you\"".into(),
                "Over a week old".into(),
                "Active thread".into(),
            ],
        }
    }

    fn render(results: &ResultSet) -> String {
        let mut out = Vec::new();
        write_console(&mut out, results).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn awkwardness_levels() {
        assert_eq!(awkwardness(100), "😬");
        assert_eq!(awkwardness(70), "😬");
        assert_eq!(awkwardness(69), "😅");
        assert_eq!(awkwardness(50), "😅");
        assert_eq!(awkwardness(20), "🤔");
    }

    #[test]
    fn console_shows_three_reasons() {
        let results = rank(&[scored("a", 78, false)], 20);
        let text = render(&results);
        assert!(text.contains("😬 Score: 78"));
        assert!(text.contains("From: Alice <alice@example.com>"));
        assert!(text.contains("📩 UNREAD | 12 days ago | 4 messages"));
        assert!(text.contains("Why: Contains question, Contains \"can you\", Over a week old"));
        assert!(!text.contains("Active thread"));
    }

    #[test]
    fn console_limits_to_top_twenty() {
        let input: Vec<ScoredThread> = (0..25).map(|i| scored(&format!("t{i}"), 40, true)).collect();
        let text = render(&rank(&input, 20));
        assert_eq!(text.matches("Score: 40").count(), CONSOLE_LIMIT);
        assert!(text.contains("... and 5 more"));
    }

    #[test]
    fn console_empty_message() {
        let text = render(&ResultSet::default());
        assert!(text.contains("Nothing overdue"));
    }

    #[test]
    fn export_writes_full_result_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILE);
        let input: Vec<ScoredThread> = (0..25).map(|i| scored(&format!("t{i}"), 40, true)).collect();
        let results = rank(&input, 20);

        export_json(&results, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 25);
        assert_eq!(entries[0]["id"], "t0");
        assert_eq!(entries[0]["daysAgo"], 12);
        assert_eq!(entries[0]["isRead"], true);
    }

    #[test]
    fn export_to_missing_directory_fails() {
        let err = export_json(&ResultSet::default(), Path::new("/nonexistent/dir/out.json"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }
}
