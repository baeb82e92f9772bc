//! campus-digest binary entrypoint.
//! `fetch` snapshots the configured feeds, `report` ranks unseen items for the
//! reader and writes the daily digest, `send` emails it, `run` does all three.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campus_digest::config::email::{EmailConfig, DEFAULT_EMAIL_CONFIG_PATH};
use campus_digest::config::llm::LlmConfig;
use campus_digest::config::settings::{DEFAULT_SETTINGS_PATH, ENV_SETTINGS_PATH};
use campus_digest::config::{load_feeds, Settings};
use campus_digest::ingest::providers::rss::RssProvider;
use campus_digest::ingest::types::FeedProvider;
use campus_digest::ingest::{self, snapshot};
use campus_digest::llm::build_chat_client;
use campus_digest::metrics::{Metrics, ENV_METRICS_PATH};
use campus_digest::notify::{digest_subject, EmailSender};
use campus_digest::score::{ChatScorer, DynScorer};
use campus_digest::translate::ChatTranslator;
use campus_digest::{report, FileSeenStore, Outcome, Pipeline};

#[derive(Parser)]
#[command(name = "campus-digest", version, about = "Personalized daily campus news digest")]
struct Cli {
    /// Settings file (TOML).
    #[arg(long, env = ENV_SETTINGS_PATH, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all feeds into today's raw snapshot.
    Fetch,
    /// Rank unseen items and write today's digest.
    Report,
    /// Email a digest (today's, or REPORT_DATE=YYYY-MM-DD).
    Send {
        #[arg(long, env = "REPORT_DATE")]
        date: Option<NaiveDate>,
        /// Email settings used when the environment is incomplete.
        #[arg(long, default_value = DEFAULT_EMAIL_CONFIG_PATH)]
        email_config: PathBuf,
    },
    /// fetch + report + send.
    Run {
        #[arg(long, default_value = DEFAULT_EMAIL_CONFIG_PATH)]
        email_config: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn,rustls=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let cli = Cli::parse();
    let settings = Settings::load_from_file(&cli.settings)?;
    let today = Local::now().date_naive();

    let result = match cli.command {
        Command::Fetch => fetch(&settings, today).await,
        Command::Report => recommend(&settings, today).await.map(|_| ()),
        Command::Send { date, email_config } => send(&settings, date.unwrap_or(today), &email_config).await,
        Command::Run { email_config } => {
            fetch(&settings, today).await?;
            if recommend(&settings, today).await? {
                send(&settings, today, &email_config).await
            } else {
                Ok(())
            }
        }
    };

    if let (Some(m), Ok(path)) = (&metrics, std::env::var(ENV_METRICS_PATH)) {
        if let Err(e) = m.write_textfile(&PathBuf::from(path)) {
            warn!(error = ?e, "failed to write metrics textfile");
        }
    }

    result
}

async fn fetch(settings: &Settings, today: NaiveDate) -> Result<()> {
    let feeds = load_feeds(&settings.paths.feeds_path)?;
    let providers = feeds
        .into_iter()
        .map(|f| RssProvider::from_source(f, settings.request_timeout()).map(|p| Box::new(p) as Box<dyn FeedProvider>))
        .collect::<Result<Vec<_>>>()?;

    let (items, failed) = ingest::run_once(&providers).await;
    if items.is_empty() {
        warn!(feeds = providers.len(), failed, "no items fetched, snapshot not written");
        return Ok(());
    }
    let path = snapshot::write_snapshot(&settings.paths.raw_dir, today, &items)?;
    info!(items = items.len(), failed, path = %path.display(), "snapshot written");
    Ok(())
}

/// Returns whether a digest was written.
async fn recommend(settings: &Settings, today: NaiveDate) -> Result<bool> {
    let (_, items) = snapshot::load_latest(&settings.paths.raw_dir, today)?;
    let tunables = settings.tunables()?;

    let llm_cfg = LlmConfig::from_env(tunables.request_timeout);
    if llm_cfg.is_none() {
        warn!("DEEPSEEK_API_KEY not set, personalized ranking will be skipped");
    }
    let chat = build_chat_client(llm_cfg.as_ref())?;
    let scorer: Option<DynScorer> = chat
        .clone()
        .map(|c| Arc::new(ChatScorer::new(c)) as DynScorer);

    let store = FileSeenStore::new(&settings.paths.seen_path);
    let pipeline = Pipeline::new(&store, scorer, tunables).enabled(settings.personalization.enable);
    let outcome = pipeline
        .run(items, &settings.personalization.user_profile, Utc::now())
        .await?;

    let Outcome::Report { report: ranked, .. } = outcome else {
        info!("no digest today");
        return Ok(false);
    };

    let translate_to = settings.report.translate_to.trim();
    let translator = ChatTranslator::new(chat.filter(|_| !translate_to.is_empty()), translate_to);
    let entries = report::build_entries(&ranked, &translator).await;
    let body = report::render(&entries, &Local::now());
    println!("{body}");

    let path = report::write_report(&settings.paths.report_dir, today, &body)?;
    info!(path = %path.display(), items = entries.len(), "digest written");
    Ok(true)
}

async fn send(settings: &Settings, date: NaiveDate, email_config: &std::path::Path) -> Result<()> {
    let body = report::load_report(&settings.paths.report_dir, date)?;
    let cfg = EmailConfig::resolve(email_config)?;
    let sender = EmailSender::from_config(&cfg).context("configuring smtp")?;
    sender.send_report(&digest_subject(date), &body).await
}
