//! End-to-end scan over a JSON thread fixture.
//!
//! Exercises source → filter → scoring → ranking → export without a mailbox.

use std::path::PathBuf;

use reply_scan::config::{PhraseMatching, ScanConfig, ScoringConfig};
use reply_scan::report::{self, DEFAULT_EXPORT_FILE};
use reply_scan::scan::scan_source;
use reply_scan::sources::{JsonFileSource, ThreadSource};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/threads.json")
}

fn config() -> ScanConfig {
    ScanConfig {
        user_address: Some("me@example.com".into()),
        ..ScanConfig::default()
    }
}

fn ids(results: &reply_scan::scoring::ResultSet) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn fixture_scan_ranks_overdue_threads() {
    let source = JsonFileSource::new(fixture());
    let results = scan_source(&source, &config()).await.unwrap();

    // noreply sender, own reply, wrapped-up chat, empty thread and the
    // out-of-window thread are all absent
    assert_eq!(
        ids(&results),
        vec!["18c1f2a9b0e4d7a1", "18c1f2a9b0e4d7a7", "18c1f2a9b0e4d7a4"]
    );
    assert_eq!(results.scores(), vec![70, 55, 25]);

    let top = &results.as_slice()[0];
    assert_eq!(top.sender_name, "Dana Whitfield");
    assert_eq!(
        top.reasons,
        vec!["Contains question", "Over a month old", "Long thread"]
    );
    assert_eq!(top.last_message, "Did you get a chance to review the redlines?");
}

#[tokio::test]
async fn results_are_sorted_and_above_minimum() {
    let source = JsonFileSource::new(fixture());
    let config = config();
    let results = scan_source(&source, &config).await.unwrap();

    let scores = results.scores();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|&s| i32::from(s) >= config.min_score && s <= 100));
}

#[tokio::test]
async fn raising_minimum_score_only_removes_results() {
    let source = JsonFileSource::new(fixture());
    let strict = ScanConfig {
        min_score: 60,
        ..config()
    };
    let results = scan_source(&source, &strict).await.unwrap();
    assert_eq!(ids(&results), vec!["18c1f2a9b0e4d7a1"]);
}

#[tokio::test]
async fn without_user_address_own_thread_is_scored() {
    let source = JsonFileSource::new(fixture());
    let results = scan_source(&source, &ScanConfig::default()).await.unwrap();

    // "Could you resend the invoice?": question + "could you", 5 days, 3 messages
    let invoice = results
        .iter()
        .find(|r| r.id == "18c1f2a9b0e4d7a5")
        .expect("own thread should be scored");
    assert_eq!(invoice.score, 58);
}

#[tokio::test]
async fn first_only_matching_counts_one_phrase() {
    let threads = r#"[
        {"id": "u", "sender_email": "ops@example.com",
         "body": "Urgent: can you reply asap", "days_ago": 0, "message_count": 1}
    ]"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threads.json");
    std::fs::write(&path, threads).unwrap();
    let source = JsonFileSource::new(&path);

    let all = scan_source(&source, &ScanConfig::default()).await.unwrap();
    // can you 20 + asap 35 + urgent 35 + reply 25, clamped
    assert_eq!(all.scores(), vec![100]);

    let first_only = ScanConfig {
        scoring: ScoringConfig {
            phrase_matching: PhraseMatching::FirstOnly,
            ..ScoringConfig::default()
        },
        ..ScanConfig::default()
    };
    let results = scan_source(&source, &first_only).await.unwrap();
    // "can you" precedes the others in the table
    assert_eq!(results.scores(), vec![20]);
    assert_eq!(results.as_slice()[0].reasons, vec!["Contains \"can you\""]);
}

#[tokio::test]
async fn source_respects_window_and_cap() {
    let source = JsonFileSource::new(fixture());
    let threads = source.fetch_threads(60, 150).await.unwrap();
    assert_eq!(threads.len(), 7);
    assert!(threads.iter().all(|t| t.id != "18c1f2a9b0e4d7a8"));

    let capped = source.fetch_threads(60, 3).await.unwrap();
    assert_eq!(capped.len(), 3);
}

#[tokio::test]
async fn scan_then_export_round_trips_keys() {
    let source = JsonFileSource::new(fixture());
    let results = scan_source(&source, &config()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_EXPORT_FILE);
    report::export_json(&results, &path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), results.len());

    let first = &entries[0];
    for key in [
        "id",
        "from",
        "email",
        "subject",
        "lastMessage",
        "daysAgo",
        "messageCount",
        "isRead",
        "score",
        "reasons",
    ] {
        assert!(first.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(first["from"], "Dana Whitfield");
    assert_eq!(first["email"], "dana@northwind.example");
    assert_eq!(first["daysAgo"], 40);
    assert_eq!(first["score"], 70);
}

#[tokio::test]
async fn console_report_lists_ranked_results() {
    let source = JsonFileSource::new(fixture());
    let results = scan_source(&source, &config()).await.unwrap();

    let mut out = Vec::new();
    report::write_console(&mut out, &results).unwrap();
    let text = String::from_utf8(out).unwrap();

    let dana = text.find("Dana Whitfield").unwrap();
    let jordan = text.find("Jordan Blake").unwrap();
    let priya = text.find("Priya Nair").unwrap();
    assert!(dana < jordan && jordan < priya);
    assert!(text.contains("😬 Score: 70"));
    assert!(text.contains("😅 Score: 55"));
    assert!(text.contains("🤔 Score: 25"));
}

// ── Mailbox threads ─────────────────────────────────────────────────

mod mailbox {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use reply_scan::config::ScanConfig;
    use reply_scan::scan::scan;
    use reply_scan::sources::threading::{MailMessage, group_into_threads};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn mail(id: &str, parent: Option<&str>, from: &str, body: &str, days_ago: i64) -> MailMessage {
        MailMessage {
            message_id: id.into(),
            in_reply_to: parent.map(String::from),
            references: Vec::new(),
            sender_name: None,
            sender_email: from.into(),
            subject: "Contract".into(),
            body: body.into(),
            date: Some(now() - Duration::days(days_ago)),
            is_seen: true,
            sent: from == "me@example.com",
        }
    }

    fn login_config() -> ScanConfig {
        ScanConfig::from_lookup(|key| match key {
            "EMAIL_IMAP_HOST" => Some("imap.example.com".into()),
            "EMAIL_USERNAME" => Some("me@example.com".into()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn thread_answered_by_login_user_is_skipped() {
        let messages = vec![
            mail("a@x", None, "dana@example.com", "Can you sign by Friday?", 45),
            mail("b@x", Some("a@x"), "me@example.com", "Signed, see attached.", 44),
        ];
        let threads = group_into_threads(messages, now(), 10);
        assert_eq!(threads[0].sender_email, "me@example.com");

        assert!(scan(threads, &login_config()).is_empty());
    }

    #[test]
    fn follow_up_after_own_reply_is_reported() {
        let messages = vec![
            mail("a@x", None, "dana@example.com", "Can you sign by Friday?", 45),
            mail("b@x", Some("a@x"), "me@example.com", "Will do.", 44),
            mail("c@x", Some("b@x"), "dana@example.com", "Any update on this?", 40),
        ];
        let threads = group_into_threads(messages, now(), 10);
        assert_eq!(threads.len(), 1);

        let results = scan(threads, &login_config());
        let top = &results.as_slice()[0];
        assert_eq!(top.id, "a@x");
        assert_eq!(top.message_count, 3);
        // question 30 + "any update" 30 + over a month 25 + active thread 8
        assert_eq!(top.score, 93);
    }
}
