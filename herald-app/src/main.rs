use anyhow::{Context, Result};
use clap::Parser;
use herald_common::observability::{LogConfig, LogFormat, init_logging};
use herald_config::{Credentials, HeraldConfig, HeraldConfigLoader};
use herald_orcid::OrcidApi;
use herald_social::DryRunPublisher;
use herald_social::bluesky::BlueskyApi;
use runner::{RunSettings, RunSummary, Runner};
use std::path::PathBuf;
use std::time::Duration;
mod runner;

/// Announce researchers' recent ORCID works on Bluesky.
#[derive(Debug, Parser)]
#[command(name = "herald", version)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Compose and log posts without logging in or posting.
    #[arg(long)]
    dry_run: bool,

    /// Log encoding: text or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Directory for the rolling log file (defaults to HERALD_LOG_DIR).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig {
        log_dir: cli.log_dir.clone(),
        format: cli.log_format,
        ..LogConfig::default()
    })?;

    // 1) Config (env wins)
    let cfg: HeraldConfig = HeraldConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // 2) Credentials before any network activity
    let creds = if cli.dry_run {
        None
    } else {
        Some(Credentials::from_env()?)
    };

    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let registry = OrcidApi::new(&cfg.registry_base_url, timeout)
        .with_context(|| format!("invalid registry URL {}", cfg.registry_base_url))?;
    let settings = RunSettings::from(&cfg);

    // 3) Run
    let summary: RunSummary = match creds {
        None => {
            tracing::info!("dry run: login and posting are skipped");
            Runner::new(registry, DryRunPublisher, settings).run().await
        }
        Some(creds) => {
            let session = BlueskyApi::new(&cfg.bluesky_service, timeout)?
                .login(&creds.handle, &creds.app_password)
                .await?;
            Runner::new(registry, session, settings).run().await
        }
    };

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
