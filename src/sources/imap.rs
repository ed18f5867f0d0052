//! IMAP thread source — read-only inbox fetch over TLS.
//!
//! Opens the mailbox with `EXAMINE` and fetches with `BODY.PEEK[]`, so a
//! scan never changes message flags. Blocking socket I/O runs inside
//! `spawn_blocking`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::{HeaderValue, MessageParser};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SourceError;
use crate::scoring::types::Thread;
use crate::sources::ThreadSource;
use crate::sources::threading::{MailMessage, group_into_threads, normalize_id, strip_html};

/// Messages fetched per requested thread. Bounds the fetch when a thread
/// limit is set.
const MESSAGES_PER_THREAD: usize = 5;

const SOURCE_NAME: &str = "imap";

// ── Configuration ───────────────────────────────────────────────────

/// IMAP source configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub mailbox: String,
    /// Mailbox holding the user's own replies, merged into threads.
    /// `None` when disabled.
    pub sent_mailbox: Option<String>,
    pub timeout_secs: u64,
}

impl ImapConfig {
    /// Build config from environment variables.
    /// Returns `None` if `EMAIL_IMAP_HOST` is not set (source disabled).
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("EMAIL_IMAP_HOST").filter(|h| !h.trim().is_empty())?;

        let port: u16 = lookup("EMAIL_IMAP_PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(993);

        let username = lookup("EMAIL_USERNAME").unwrap_or_default();
        let password = SecretString::from(lookup("EMAIL_PASSWORD").unwrap_or_default());

        let mailbox = lookup("EMAIL_IMAP_MAILBOX")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "INBOX".to_string());

        // Unset means "Sent"; set but empty disables the merge
        let sent_mailbox = match lookup("EMAIL_IMAP_SENT_MAILBOX") {
            None => Some("Sent".to_string()),
            Some(m) if m.trim().is_empty() => None,
            Some(m) => Some(m.trim().to_string()),
        };

        let timeout_secs: u64 = lookup("EMAIL_IMAP_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(30);

        Some(Self {
            host: host.trim().to_string(),
            port,
            username,
            password,
            mailbox,
            sent_mailbox,
            timeout_secs,
        })
    }
}

// ── Source ──────────────────────────────────────────────────────────

/// Inbox threads over IMAP.
pub struct ImapSource {
    config: ImapConfig,
}

impl ImapSource {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ThreadSource for ImapSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_threads(
        &self,
        days_back: u32,
        max_results: usize,
    ) -> Result<Vec<Thread>, SourceError> {
        let since = Utc::now() - chrono::Duration::days(i64::from(days_back));
        let max_messages = max_results.saturating_mul(MESSAGES_PER_THREAD);
        let cfg = self.config.clone();

        let messages =
            tokio::task::spawn_blocking(move || fetch_messages(&cfg, since, max_messages))
                .await
                .map_err(|e| SourceError::Task(e.to_string()))??;

        debug!(count = messages.len(), "Fetched messages");
        Ok(group_into_threads(messages, Utc::now(), max_results))
    }
}

// ── IMAP session ────────────────────────────────────────────────────

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// Buffered reads over a stream that is also written to.
struct Duplex<T>(BufReader<T>);

impl<T: Read> Read for Duplex<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<T: Read> BufRead for Duplex<T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.0.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.0.consume(amt)
    }
}

impl<T: Read + Write> Write for Duplex<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.get_mut().flush()
    }
}

/// One untagged response, with any literal payloads it carried.
#[derive(Debug, Default)]
struct ResponseItem {
    text: String,
    literal: Option<Vec<u8>>,
}

/// Minimal tagged-command IMAP client.
struct ImapSession<S> {
    stream: S,
    next_tag: u32,
}

impl ImapSession<Duplex<TlsStream>> {
    fn connect(config: &ImapConfig) -> Result<Self, SourceError> {
        let connect_err = |reason: String| SourceError::ConnectFailed {
            name: SOURCE_NAME.into(),
            reason,
        };

        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| connect_err(format!("{}:{}: {e}", config.host, config.port)))?;
        tcp.set_read_timeout(Some(Duration::from_secs(config.timeout_secs)))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(config.host.clone())
            .map_err(|e| connect_err(format!("invalid server name: {e}")))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| connect_err(format!("TLS setup failed: {e}")))?;

        let mut session = Self::new(Duplex(BufReader::new(rustls::StreamOwned::new(conn, tcp))));

        let greeting = session.read_line()?;
        if !greeting.starts_with("* OK") {
            return Err(protocol(format!("unexpected greeting: {}", greeting.trim())));
        }
        Ok(session)
    }
}

impl<S: BufRead + Write> ImapSession<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            next_tag: 1,
        }
    }

    fn read_line(&mut self) -> Result<String, SourceError> {
        let mut buf = Vec::new();
        let read = self.stream.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Err(protocol("connection closed".into()));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_literal(&mut self, len: usize) -> Result<Vec<u8>, SourceError> {
        let mut buf = vec![0_u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Send a command and collect untagged responses until its tagged
    /// completion. Errors unless the completion is `OK`.
    ///
    /// A line ending in `{N}` is followed by N raw bytes; the response
    /// continues on the line after them.
    fn command(&mut self, cmd: &str) -> Result<Vec<ResponseItem>, SourceError> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        self.stream.write_all(format!("{tag} {cmd}\r\n").as_bytes())?;
        self.stream.flush()?;

        let mut items = Vec::new();
        let mut current = ResponseItem::default();
        loop {
            let line = self.read_line()?;

            if line.starts_with(&format!("{tag} ")) {
                let status = line[tag.len()..].trim();
                if !status.starts_with("OK") {
                    return Err(protocol(format!("{} failed: {status}", command_name(cmd))));
                }
                break;
            }

            current.text.push_str(line.trim_end_matches(['\r', '\n']));
            match literal_len(&line) {
                Some(len) => {
                    let literal = self.read_literal(len)?;
                    current.literal = Some(literal);
                }
                None => items.push(std::mem::take(&mut current)),
            }
        }

        Ok(items)
    }

    fn login(&mut self, username: &str, password: &SecretString) -> Result<(), SourceError> {
        let cmd = format!(
            "LOGIN {} {}",
            quote(username),
            quote(password.expose_secret())
        );
        self.command(&cmd).map(|_| ()).map_err(|_| SourceError::AuthFailed {
            name: SOURCE_NAME.into(),
        })
    }

    fn logout(&mut self) {
        if let Err(e) = self.command("LOGOUT") {
            debug!("IMAP logout failed: {e}");
        }
    }
}

fn protocol(reason: String) -> SourceError {
    SourceError::Protocol {
        name: SOURCE_NAME.into(),
        reason,
    }
}

/// Command verb for error messages (never echoes credentials).
fn command_name(cmd: &str) -> &str {
    cmd.split_whitespace().next().unwrap_or("command")
}

/// Length of a `{N}` literal announced at the end of a response line.
fn literal_len(line: &str) -> Option<usize> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let inner = trimmed.strip_suffix('}')?;
    let start = inner.rfind('{')?;
    inner[start + 1..].parse().ok()
}

/// IMAP quoted string.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// IMAP date for SEARCH SINCE, e.g. `01-Feb-2026`.
fn imap_date(date: DateTime<Utc>) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Sequence numbers from `* SEARCH` responses.
fn parse_search(items: &[ResponseItem]) -> Vec<u32> {
    items
        .iter()
        .filter_map(|item| item.text.strip_prefix("* SEARCH"))
        .flat_map(|rest| rest.split_whitespace().filter_map(|n| n.parse().ok()))
        .collect()
}

/// Inbox messages newer than `since`, plus the user's replies from the
/// sent mailbox when one is configured.
fn fetch_messages(
    config: &ImapConfig,
    since: DateTime<Utc>,
    max_messages: usize,
) -> Result<Vec<MailMessage>, SourceError> {
    let mut session = ImapSession::connect(config)?;
    session.login(&config.username, &config.password)?;

    let mut messages = fetch_mailbox(&mut session, &config.mailbox, since, max_messages, false)?;

    if let Some(sent) = &config.sent_mailbox {
        match fetch_mailbox(&mut session, sent, since, max_messages, true) {
            Ok(mut replies) => {
                debug!(mailbox = %sent, count = replies.len(), "Merged sent messages");
                messages.append(&mut replies);
            }
            // Replied-by-user detection degrades, the scan still runs
            Err(e) => warn!(mailbox = %sent, "Skipping sent mailbox: {e}"),
        }
    }

    session.logout();
    Ok(messages)
}

/// Newest `max_messages` messages of one mailbox since `since`, read-only.
fn fetch_mailbox<S: BufRead + Write>(
    session: &mut ImapSession<S>,
    mailbox: &str,
    since: DateTime<Utc>,
    max_messages: usize,
    sent: bool,
) -> Result<Vec<MailMessage>, SourceError> {
    session.command(&format!("EXAMINE {}", quote(mailbox)))?;

    let search = session.command(&format!("SEARCH SINCE {}", imap_date(since)))?;
    let mut sequence = parse_search(&search);
    if sequence.len() > max_messages {
        sequence.drain(..sequence.len() - max_messages);
    }

    info!(mailbox = %mailbox, matched = sequence.len(), "Fetching messages");

    if sequence.is_empty() {
        return Ok(Vec::new());
    }

    let set = sequence
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let items = session.command(&format!("FETCH {set} (FLAGS BODY.PEEK[])"))?;
    Ok(messages_from_fetch(items, sent))
}

/// Parse FETCH responses that carried a message body.
fn messages_from_fetch(items: Vec<ResponseItem>, sent: bool) -> Vec<MailMessage> {
    items
        .into_iter()
        .filter_map(|item| {
            let raw = item.literal?;
            let is_seen = item.text.contains("\\Seen");
            let parsed = parse_message(&raw, is_seen);
            if parsed.is_none() {
                warn!("Skipping unparseable message");
            }
            parsed
        })
        .map(|mut message| {
            message.sent = sent;
            message
        })
        .collect()
}

// ── Message parsing ─────────────────────────────────────────────────

/// Parse a raw RFC 822 message into the fields threading needs.
pub fn parse_message(raw: &[u8], is_seen: bool) -> Option<MailMessage> {
    let parsed = MessageParser::default().parse(raw)?;

    let from = parsed.from().and_then(|addr| addr.first());
    let sender_email = from
        .and_then(|a| a.address())
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "unknown".into());
    let sender_name = from.and_then(|a| a.name()).map(|s| s.to_string());

    let message_id = parsed
        .message_id()
        .map(normalize_id)
        .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

    let in_reply_to = header_ids(parsed.in_reply_to()).into_iter().next();
    let references = header_ids(parsed.references());

    let body = if let Some(text) = parsed.body_text(0) {
        text.to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        String::new()
    };

    // to_timestamp applies the header's zone offset
    let date = parsed
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

    Some(MailMessage {
        message_id,
        in_reply_to,
        references,
        sender_name,
        sender_email,
        subject: parsed.subject().unwrap_or("(No Subject)").to_string(),
        body,
        date,
        is_seen,
        sent: false,
    })
}

fn header_ids(value: &HeaderValue<'_>) -> Vec<String> {
    match value {
        HeaderValue::Text(id) => vec![normalize_id(id)],
        HeaderValue::TextList(ids) => ids.iter().map(|id| normalize_id(id)).collect(),
        _ => Vec::new(),
    }
}
