use std::path::PathBuf;

use reply_scan::config::ScanConfig;
use reply_scan::error::ConfigError;
use reply_scan::report::{self, DEFAULT_EXPORT_FILE};
use reply_scan::scan::scan_source;
use reply_scan::sources::{ImapConfig, ImapSource, JsonFileSource, ThreadSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = ScanConfig::from_env()?;

    eprintln!("📬 Reply Scan v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Window: last {} days", config.days_back);
    eprintln!("   Max threads: {}", config.max_results);
    eprintln!("   Min score: {}", config.min_score);

    // ── Thread source ───────────────────────────────────────────────────
    let source: Box<dyn ThreadSource> = if let Some(path) = std::env::var("REPLY_SCAN_INPUT")
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        eprintln!("   Source: {path}");
        Box::new(JsonFileSource::new(path.trim()))
    } else if let Some(imap_config) = ImapConfig::from_env() {
        eprintln!(
            "   Source: imap://{}:{}/{}",
            imap_config.host, imap_config.port, imap_config.mailbox
        );
        Box::new(ImapSource::new(imap_config))
    } else {
        eprintln!("Error: no thread source configured");
        eprintln!("  export EMAIL_IMAP_HOST=imap.example.com EMAIL_USERNAME=... EMAIL_PASSWORD=...");
        eprintln!("  or export REPLY_SCAN_INPUT=threads.json");
        return Err(ConfigError::MissingEnvVar("EMAIL_IMAP_HOST".into()).into());
    };

    let export_path = std::env::var("REPLY_SCAN_EXPORT")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));

    eprintln!("   Export: {}\n", export_path.display());

    // ── Scan ────────────────────────────────────────────────────────────
    let results = scan_source(source.as_ref(), &config).await?;

    let mut stdout = std::io::stdout().lock();
    report::write_console(&mut stdout, &results)?;
    report::export_json(&results, &export_path)?;

    eprintln!("\nExported {} results to {}", results.len(), export_path.display());
    Ok(())
}
