use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{fmt::Display, path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};
use vinlookup::{app::App, config::Config, normalize::Mode};

/// Resolve partial VINs to unit records, online or offline.
#[derive(Parser, Debug)]
#[command(name = "vinlookup", version)]
struct Args {
    /// YAML config file
    #[arg(short, long, env = "VINLOOKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Dataset URL (enables the network tier)
    #[arg(long, env = "VINLOOKUP_DATASET_URL")]
    dataset_url: Option<String>,

    /// Cache-busting build version sent with the dataset request
    #[arg(long, env = "VINLOOKUP_BUILD_VERSION")]
    build_version: Option<String>,

    /// Directory holding the durable dataset snapshot
    #[arg(long, env = "VINLOOKUP_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Never touch the network
    #[arg(long)]
    offline: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset and report where it came from
    Status,
    /// Look up typed input (first 8 alphanumerics)
    Lookup { key: String },
    /// Look up text produced by character recognition
    Ocr { text: String },
    /// Look up by unit number
    Unit { value: String },
    /// Look up by license plate
    Plate { value: String },
    /// Interactive session with periodic background reloads
    Repl,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(url) = &self.dataset_url {
            config.dataset_url = Some(url.clone());
        }
        if let Some(v) = &self.build_version {
            config.build_version = v.clone();
        }
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = dir.clone();
        }
        config.offline |= self.offline;
        Ok(config)
    }
}

fn emit<T: Serialize + Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = value.to_string();
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) config ───────────────────────────────────────────────────
    let args = Args::parse();
    let config = args.config()?;
    debug!(?config, "effective config");

    // ─── 3) load dataset ─────────────────────────────────────────────
    let app = Arc::new(App::from_config(&config)?);
    let status = app.refresh().await;

    // ─── 4) dispatch ─────────────────────────────────────────────────
    match &args.command {
        Command::Status => emit(&status, args.json)?,
        Command::Lookup { key } => emit(&app.lookup(key, Mode::Direct), args.json)?,
        Command::Ocr { text } => emit(&app.lookup(text, Mode::RecognizedText), args.json)?,
        Command::Unit { value } => emit(&app.lookup_unit(value), args.json)?,
        Command::Plate { value } => emit(&app.lookup_plate(value), args.json)?,
        Command::Repl => {
            emit(&status, args.json)?;
            repl(app, &config, args.json).await?;
        }
    }
    Ok(())
}

async fn repl(app: Arc<App>, config: &Config, json: bool) -> Result<()> {
    let refresher = config.refresh_interval().map(|every| {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let status = app.refresh().await;
                debug!(tier = %status.tier, "background refresh");
            }
        })
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            "" => continue,
            "quit" | "exit" => break,
            "status" => emit(&app.status(), json)?,
            "refresh" => emit(&app.refresh().await, json)?,
            "unit" => emit(&app.lookup_unit(rest), json)?,
            "plate" => emit(&app.lookup_plate(rest), json)?,
            "ocr" => emit(&app.lookup(rest, Mode::RecognizedText), json)?,
            _ => emit(&app.lookup(line, Mode::Direct), json)?,
        }
    }

    if let Some(handle) = refresher {
        handle.abort();
    }
    info!("session closed");
    Ok(())
}
