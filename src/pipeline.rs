//! The featured-image run, end to end.
//!
//! Articles are handled one at a time: locate candidates on note.com, download
//! the first one that works, patch the local article page. Once every article
//! is done, both listing pages are regenerated from the full list and the
//! images collected along the way.
//!
//! Only a missing/malformed article list or an unusable image directory aborts
//! the run. Everything else is logged and skipped.

use crate::cli::Cli;
use crate::models::{Article, FeaturedImageMap, load_articles};
use crate::outputs::article::add_featured_image;
use crate::outputs::listing::{BLOG_PAGE_ANCHOR, HOME_PAGE_ANCHOR, update_listing_page};
use crate::scrapers::build_client;
use crate::scrapers::downloader::download_image;
use crate::scrapers::locator::locate_image_candidates;
use crate::utils::{ensure_writable_dir, truncate_for_log};
use reqwest::Client;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Paths of the static site being updated.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn article_page(&self, article: &Article) -> PathBuf {
        self.root.join(article.page_path())
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("img").join("blog")
    }

    pub fn blog_page(&self) -> PathBuf {
        self.root.join("blog.html")
    }

    pub fn home_page(&self) -> PathBuf {
        self.root.join("index.html")
    }
}

/// What happened to one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Image downloaded and written into the article page.
    Patched(String),
    /// Image downloaded, but the article page could not be patched.
    Unpatched(String),
    /// The article page has no usable image.
    NoImage,
    /// `blog/<slug>.html` does not exist.
    MissingPage,
    /// The article page could not be fetched.
    FetchFailed,
}

impl ArticleOutcome {
    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Patched(path) | Self::Unpatched(path) => Some(path.as_str()),
            _ => None,
        }
    }
}

/// Totals reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub articles: usize,
    pub with_image: usize,
    pub patched: usize,
    pub listings_updated: usize,
}

/// Download the first candidate that succeeds.
async fn first_downloadable(client: &Client, candidates: &[String], image_dir: &Path) -> Option<String> {
    for candidate in candidates {
        if let Some(local) = download_image(client, candidate, image_dir).await {
            return Some(local);
        }
    }
    None
}

/// Locate, download and inject the featured image of one article.
#[instrument(level = "info", skip_all, fields(slug = %article.slug))]
pub async fn process_article(client: &Client, site: &SiteLayout, article: &Article) -> ArticleOutcome {
    info!(title = %truncate_for_log(&article.title, 80), "Processing article");

    let page = site.article_page(article);
    if !page.exists() {
        warn!(file = %page.display(), "Article page not found");
        return ArticleOutcome::MissingPage;
    }

    let candidates = match locate_image_candidates(client, &article.url).await {
        Ok(candidates) => candidates,
        Err(e) => {
            error!(url = %article.url, error = %e, "Could not fetch article");
            return ArticleOutcome::FetchFailed;
        }
    };

    let Some(image) = first_downloadable(client, &candidates, &site.image_dir()).await else {
        info!("No featured image found");
        return ArticleOutcome::NoImage;
    };
    info!(%image, "Found featured image");

    match add_featured_image(&page, &image).await {
        Ok(true) => ArticleOutcome::Patched(image),
        Ok(false) => ArticleOutcome::Unpatched(image),
        Err(e) => {
            error!(file = %page.display(), error = %e, "Could not patch article page");
            ArticleOutcome::Unpatched(image)
        }
    }
}

/// Run the whole update for the site described by `args`.
#[instrument(level = "info", skip_all, fields(site_root = %args.site_root.display()))]
pub async fn run(args: &Cli) -> Result<RunSummary, Box<dyn Error>> {
    let site = SiteLayout::new(&args.site_root);
    let articles = load_articles(&args.articles_path()).await?;
    ensure_writable_dir(&site.image_dir()).await?;
    let client = build_client(&args.user_agent, Duration::from_secs(args.timeout_secs))?;

    let mut summary = RunSummary {
        articles: articles.len(),
        ..RunSummary::default()
    };
    let mut images = FeaturedImageMap::new();

    for article in &articles {
        let outcome = process_article(&client, &site, article).await;
        if let ArticleOutcome::Patched(_) = outcome {
            summary.patched += 1;
        }
        if let Some(image) = outcome.image() {
            images.insert(article.slug.clone(), image.to_string());
        }
    }
    summary.with_image = images.len();

    info!("Updating listing pages");
    for (path, anchor) in [
        (site.blog_page(), &BLOG_PAGE_ANCHOR),
        (site.home_page(), &HOME_PAGE_ANCHOR),
    ] {
        match update_listing_page(&path, anchor, &articles, &images).await {
            Ok(()) => summary.listings_updated += 1,
            Err(e) => error!(path = %path.display(), error = %e, "Could not update listing page"),
        }
    }

    Ok(summary)
}
