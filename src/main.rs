//! # note_featured
//!
//! Pulls the featured image of each note.com article a static blog mirrors,
//! stores it under `img/blog/`, puts it at the top of the local article page,
//! and regenerates the article cards of the listing pages.
//!
//! ## Usage
//!
//! ```sh
//! cd site && note_featured
//! ```
//!
//! ## Architecture
//!
//! The run is strictly sequential:
//! 1. **Loading**: read `note_articles.json` (fatal if missing or malformed)
//! 2. **Locating**: fetch each article on note.com and list image candidates
//! 3. **Downloading**: store the first candidate that downloads, reusing files
//!    already on disk
//! 4. **Patching**: insert or update the header image of `blog/<slug>.html`
//! 5. **Listing**: re-render the cards of `blog.html` and `index.html`

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("note_featured starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let summary = match pipeline::run(&args).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        articles = summary.articles,
        with_image = summary.with_image,
        patched = summary.patched,
        listings_updated = summary.listings_updated,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Completed: featured images for {} articles",
        summary.with_image
    );

    Ok(())
}
