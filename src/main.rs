use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use banner_watch::config::{parse_interval, AppConfig};
use banner_watch::fetch::StaticPage;
use banner_watch::models::{BannerRecord, EndgameContent};
use banner_watch::storage::StorageConfig;
use banner_watch::sync::{AnnouncementSync, SyncConfig, SyncResult};
use banner_watch::{classify_by_time, BannerService, ServiceError, TimeBuckets};

#[derive(Parser)]
#[command(name = "banner-watch")]
#[command(about = "Honkai: Star Rail banner tracker")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the banner page and list active and upcoming banners
    Scan {
        /// Print records as JSON
        #[arg(long)]
        json: bool,

        /// Ignore the snapshot cache
        #[arg(long)]
        fresh: bool,
    },

    /// Extract banners from a saved copy of the page
    ParseFixture {
        path: PathBuf,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List endgame mode countdowns
    Endgame {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Announce banners that have not been announced yet
    Sync {
        /// Run continuously at interval
        #[arg(long)]
        watch: bool,

        /// Sync interval (e.g., "24h", "30m"); defaults to the configured one
        #[arg(long)]
        interval: Option<String>,

        /// Report new banners without recording them
        #[arg(long)]
        dry_run: bool,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("loading config from {:?}", cli.config))?
    } else {
        AppConfig::default()
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(config)
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting banner-watch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan { json, fresh } => {
            let mut config = config;
            if fresh {
                config.source.cache_ttl_seconds = 0;
            }
            let service = BannerService::builder(config).build()?;
            let now = Utc::now();
            match service.try_fetch_banners(now).await {
                Ok(report) => print_buckets(&classify_by_time(&report.banners, now), json)?,
                Err(e) if e.is_unavailable() => report_unavailable(&e),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::ParseFixture { path, json } => {
            let html = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {:?}", path))?;
            let service = BannerService::builder(config)
                .page_source(Arc::new(StaticPage(html)))
                .build()?;
            let now = Utc::now();
            let report = service.try_fetch_banners(now).await?;

            eprintln!(
                "{} candidates, {} rejected, {} skipped, {} empty, {} degraded cards",
                report.candidates, report.rejected, report.skipped, report.empty, report.degraded_entities
            );
            print_buckets(&classify_by_time(&report.banners, now), json)?;
        }

        Commands::Endgame { json } => {
            let service = BannerService::builder(config).build()?;
            match service.try_fetch_endgame().await {
                Ok(entries) => print_endgame(&entries, json)?,
                Err(e) if e.is_unavailable() => report_unavailable(&e),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Sync {
            watch,
            interval,
            dry_run,
        } => {
            let interval = interval.unwrap_or_else(|| config.schedule.interval.clone());
            let interval = parse_interval(&interval)?;

            let sync_config = SyncConfig {
                interval,
                dry_run,
                storage: StorageConfig::new(config.data_dir.clone()),
            };
            let service = Arc::new(BannerService::builder(config).build()?);
            let sync = Arc::new(AnnouncementSync::new(sync_config, service)?);

            if watch {
                tokio::select! {
                    _ = sync.clone().run_periodic(|result| print_sync_result(result, dry_run)) => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received Ctrl-C, stopping");
                        sync.cancel().await;
                    }
                }
            } else {
                let result = sync.sync_once().await?;
                print_sync_result(&result, dry_run);
            }
        }
    }

    Ok(())
}

fn report_unavailable(error: &ServiceError) {
    tracing::error!("Could not fetch the banner page: {}", error);
    println!("No banners found. The wiki could not be reached, try again later.");
}

fn print_buckets(buckets: &TimeBuckets, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(buckets)?);
        return Ok(());
    }

    if buckets.is_empty() {
        println!("No current or upcoming banners.");
        return Ok(());
    }

    for (title, banners) in [
        ("Active", &buckets.active),
        ("Upcoming", &buckets.upcoming),
        ("Undated", &buckets.undated),
    ] {
        if banners.is_empty() {
            continue;
        }
        println!("\n=== {} ({}) ===", title, banners.len());
        for banner in banners {
            print_banner(banner);
        }
    }

    Ok(())
}

fn print_banner(banner: &BannerRecord) {
    println!("\n{} [{}]", banner.display_name, banner.composition_kind);
    if let Some(start) = banner.start_time {
        println!("  Starts:    {}", start.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(end) = banner.end_time {
        println!("  Ends:      {}", end.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("  Remaining: {}", banner.remaining_time_text);

    for character in banner.characters() {
        println!(
            "  {} {} ({})",
            character.rarity_tier, character.name, character.affinity
        );
    }
    for item in banner.items() {
        println!("  {} {}", item.rarity_tier, item.name);
    }
}

fn print_endgame(entries: &[EndgameContent], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No endgame content found.");
    }
    for entry in entries {
        println!(
            "{:<20} {:<8} {}",
            entry.mode.to_string(),
            entry.version,
            entry.time_remaining
        );
    }

    Ok(())
}

fn print_sync_result(result: &SyncResult, dry_run: bool) {
    println!("\n=== Sync Results ===");
    println!("Live banners:     {}", result.live_banners);
    println!("New banners:      {}", result.new_banners.len());
    println!("Skipped:          {}", result.skipped);
    println!("Degraded cards:   {}", result.degraded_entities);
    println!("Duration:         {:?}", result.duration);

    for banner in &result.new_banners {
        print_banner(banner);
    }

    if dry_run {
        println!("\n(dry run - nothing recorded)");
    }
}
