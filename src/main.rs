//! # Nanfang+ Harvester
//!
//! Collects articles and their comment threads from the Nanfang+ (nfplus)
//! content platform and appends them to flat tables for later analysis.
//!
//! ## Usage
//!
//! ```sh
//! nfplus_harvest account 中山大学
//! nfplus_harvest column 123456
//! nfplus_harvest urls --file listing.txt
//! nfplus_harvest article https://static.nfnews.com/content/202501/02/c1.html
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: an account search, a column's article listing, or a list
//!    of article URLs exported from the app
//! 2. **Extraction**: paginated JSON listings and article page scraping
//! 3. **Storage**: one append-only table per record kind (CSV or JSON Lines)
//!
//! Everything runs sequentially on purpose; the comment endpoint in
//! particular is paced at one page per second.

use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod models;
mod pagination;
mod pipeline;
mod retry;
mod scrapers;
mod source;
mod storage;
mod utils;

use cli::{Cli, Command};
use config::{Config, StorageKind};
use http::HttpFetcher;
use pipeline::Harvester;
use source::{SeenTitles, read_listing};
use storage::StorageHandle;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("nfplus_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    debug!(data_dir = %config.data_dir.display(), storage = ?config.storage, "Effective configuration");

    // Early check: ensure the data dir is writable
    if config.storage != StorageKind::Memory {
        if let Err(e) = ensure_writable_dir(&config.data_dir).await {
            error!(
                path = %config.data_dir.display(),
                error = %e,
                "Data directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let fetcher = HttpFetcher::new(config.request_timeout())?;
    let storage = StorageHandle::open(&config);
    debug!(kind = ?storage.kind(), "Storage opened");
    let harvester = Harvester::new(&fetcher, &storage, &config);

    match &args.command {
        Command::Account { name } => {
            let summary = harvester.harvest_account(name).await?;
            info!(%summary, "Account harvest complete");
        }
        Command::Column { id } => {
            let summary = harvester.harvest_column(id).await;
            info!(%summary, "Column harvest complete");
        }
        Command::Urls { file } => {
            let items = match file {
                Some(path) => read_listing(BufReader::new(File::open(path)?))?,
                None => read_listing(io::stdin().lock())?,
            };
            info!(count = items.len(), "Read article listing");
            let (summary, _) = harvester.harvest_listing(&items, SeenTitles::new()).await;
            info!(%summary, "Listing harvest complete");
        }
        Command::Article { url } => match harvester.harvest_article_url(url).await? {
            Some((article, comments)) => {
                println!("{}", serde_json::to_string_pretty(&article)?);
                info!(comments = comments.len(), "Article harvest complete");
            }
            None => error!(%url, "Article page unavailable"),
        },
    }

    if let StorageHandle::Memory(mem) = &storage {
        info!(
            accounts = mem.accounts().len(),
            articles = mem.articles().len(),
            entries = mem.entries().len(),
            comments = mem.comments().len(),
            "Dry run; nothing was written"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "nfplus_harvest finished"
    );
    Ok(())
}
