//! Data models for the article list and the featured images collected per run.
//!
//! - [`Article`]: one entry of the article list file (`note_articles.json`)
//! - [`FeaturedImageMap`]: slug → site-relative image path, built while the
//!   articles are processed
//!
//! The article list is read once at startup by [`load_articles`]. A missing or
//! malformed file is fatal, so every `date_obj` is validated up front.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

/// Slug → site-relative image path (`../img/blog/<file>`).
///
/// Articles for which no image was found are absent from the map.
pub type FeaturedImageMap = HashMap<String, String>;

/// A single blog article as listed in the article source file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Article {
    /// Display title, also used for tag inference.
    pub title: String,
    /// URL-safe identifier; names `blog/<slug>.html`.
    pub slug: String,
    /// The article's URL on note.com.
    pub url: String,
    /// Human-readable publication date shown on cards.
    pub date: String,
    /// ISO-8601 date or date-time used for ordering.
    pub date_obj: String,
    /// Short teaser rendered under the title.
    #[serde(default)]
    pub excerpt: String,
}

impl Article {
    /// Parse `date_obj` into a sortable timestamp.
    pub fn published_at(&self) -> Option<NaiveDateTime> {
        parse_iso_datetime(&self.date_obj)
    }

    /// Local article page for this slug, relative to the site root.
    pub fn page_path(&self) -> String {
        format!("blog/{}.html", self.slug)
    }
}

/// Parse the ISO-8601 shapes the article list uses.
///
/// Accepts `YYYY-MM-DD`, naive date-times with or without seconds/fractions,
/// and RFC 3339 timestamps (converted to UTC).
pub fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Why the article source could not be loaded.
#[derive(Debug)]
pub enum ArticleSourceError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    /// An article's `date_obj` is not an ISO date.
    BadDate { slug: String, value: String },
}

impl fmt::Display for ArticleSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read article list: {e}"),
            Self::Json(e) => write!(f, "malformed article list (JSON): {e}"),
            Self::Yaml(e) => write!(f, "malformed article list (YAML): {e}"),
            Self::BadDate { slug, value } => {
                write!(f, "article '{slug}' has an invalid date_obj '{value}'")
            }
        }
    }
}

impl Error for ArticleSourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Yaml(e) => Some(e),
            Self::BadDate { .. } => None,
        }
    }
}

/// Parse an article list from text. YAML when `yaml` is set, JSON otherwise.
pub fn parse_articles(text: &str, yaml: bool) -> Result<Vec<Article>, ArticleSourceError> {
    let articles: Vec<Article> = if yaml {
        serde_yaml::from_str(text).map_err(ArticleSourceError::Yaml)?
    } else {
        serde_json::from_str(text).map_err(ArticleSourceError::Json)?
    };

    if let Some(bad) = articles.iter().find(|a| a.published_at().is_none()) {
        return Err(ArticleSourceError::BadDate {
            slug: bad.slug.clone(),
            value: bad.date_obj.clone(),
        });
    }
    Ok(articles)
}

/// Read the article list file once.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_articles(path: &Path) -> Result<Vec<Article>, ArticleSourceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(ArticleSourceError::Io)?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let articles = parse_articles(&text, yaml)?;
    info!(count = articles.len(), "Loaded article list");
    Ok(articles)
}
