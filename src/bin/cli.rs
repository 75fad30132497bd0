//! ScholarSync CLI
//!
//! Runs blog syncs and citation harvests against the catalog database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scholarsync::{
    config::load_config,
    context::AppContext,
    error::Result,
    models::{HarvestReport, SyncReport},
    pipeline::{BlogSyncer, CitationHarvester},
    services::{HttpFetcher, discover_feed},
};

/// ScholarSync - science blog and citation aggregator
#[derive(Parser, Debug)]
#[command(
    name = "scholarsync",
    version,
    about = "Aggregates science blog posts and their citations"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "scholarsync.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync posts from every active blog, or from one
    Sync {
        /// Only this blog
        #[arg(long)]
        slug: Option<String>,

        /// Page to fetch (with --slug)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Ignore the last sync time and re-read everything
        #[arg(long)]
        force: bool,
    },

    /// Harvest citations for every tracked DOI prefix, or for one
    Harvest {
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Find the feed advertised by a home page
    Discover {
        /// Home page URL
        url: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn log_sync_reports(reports: &[SyncReport]) {
    let mut total = SyncReport::new("total");
    for report in reports {
        log::info!("{}", report);
        total.merge(report);
    }
    log::info!("{}", total);
    for error in &total.errors {
        log::warn!("  {}", error);
    }
}

fn log_harvest_reports(reports: &[HarvestReport]) {
    let mut total = HarvestReport::new("total");
    for report in reports {
        log::info!("{}", report);
        total.merge(report);
    }
    log::info!("{}", total);
    for error in &total.errors {
        log::warn!("  {}", error);
    }
}

async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Sync {
            slug: Some(slug),
            page,
            force,
        } => {
            let sync = BlogSyncer::from_context(ctx)?
                .sync_blog_report(&slug, page, force)
                .await?;
            log_sync_reports(&[sync.report]);
        }

        Command::Sync {
            slug: None, force, ..
        } => {
            let reports = BlogSyncer::from_context(ctx)?.sync_all_blogs(force).await?;
            log_sync_reports(&reports);
        }

        Command::Harvest {
            prefix: Some(prefix),
        } => {
            let harvest = CitationHarvester::from_context(ctx)
                .harvest_prefix(&prefix)
                .await?;
            log_harvest_reports(&[harvest.report]);
        }

        Command::Harvest { prefix: None } => {
            let reports = CitationHarvester::from_context(ctx)
                .harvest_all_citations()
                .await?;
            log_harvest_reports(&reports);
        }

        Command::Validate | Command::Discover { .. } => {}
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Validate => {
            log::info!("✓ Config OK");
        }

        Command::Discover { url } => {
            let fetcher = HttpFetcher::new(&config.http)?;
            if let Some(feed) = discover_feed(&fetcher, &url, config.http.feed_timeout()).await? {
                println!("{}\t{}", feed.format, feed.url);
            }
        }

        command => {
            let ctx = AppContext::connect(config).await?;
            let result = run(&ctx, command).await;
            ctx.close().await;
            result?;
        }
    }

    log::info!("Done!");
    Ok(())
}
