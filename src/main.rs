use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use friendfeed::config::{Config, TOKEN_ENV};
use friendfeed::feed::{export_opml, export_to_file};
use friendfeed::pipeline::{self, FriendFeeder};

#[derive(Parser, Debug)]
#[command(
    name = "friendfeed",
    version,
    about = "Export the RSS/Atom feeds of the accounts a Twitter user follows as OPML"
)]
struct Args {
    /// Account whose following-list is scanned
    username: String,

    /// Config file (default: ~/.config/friendfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the OPML document here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Homepages fetched concurrently per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() {
    // stdout carries the OPML document, so all diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("FATAL: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.validate().context("Invalid configuration")?;
    tracing::debug!(config = ?config, "Effective configuration");

    // No request may go out without a credential
    let env_token = std::env::var(TOKEN_ENV).ok();
    let bearer = config.require_bearer(env_token.as_deref())?;

    let username = args.username.trim().trim_start_matches('@');
    anyhow::ensure!(!username.is_empty(), "Username must not be empty");

    let feeder = FriendFeeder::from_config(&config, bearer)?;
    let friends = feeder.run(username).await?;

    pipeline::write_status(&friends, &mut std::io::stderr().lock())
        .context("Failed to write status lines")?;

    let outlines = pipeline::outlines(&friends);
    let title = pipeline::document_title(username);

    match args.output {
        Some(path) => {
            export_to_file(&outlines, &title, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), feeds = outlines.len(), "Wrote OPML");
        }
        None => {
            let document = export_opml(&outlines, &title)?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(document.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write OPML to stdout")?;
        }
    }

    Ok(())
}
