//! Featured image discovery on note.com article pages.
//!
//! The content container is the first match of, in order:
//!
//! 1. a `div` with a class matching `note-body|note-content|article-body`
//!    (case-insensitive)
//! 2. `<article>`
//! 3. `<main>`
//!
//! Inside it, `<img>` elements are read in document order (`src`, then the
//! lazy-load attributes `data-src` and `data-original`). Inline
//! `background-image: url(...)` declarations come after every `<img>`
//! candidate. Placeholders are dropped by [`is_rejected_image_url`].
//!
//! Candidates are handed on as URL text. A source that is already absolute is
//! kept exactly as the page wrote it, since hash-derived filenames are
//! computed from that text. Relative sources are resolved against the
//! article URL.

use super::is_rejected_image_url;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument};
use url::{ParseError, Url};

static CONTENT_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)note-body|note-content|article-body").unwrap());
static BACKGROUND_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(["']?([^"'()]+)["']?\)"#).unwrap());

static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div[class]").unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static STYLED: Lazy<Selector> = Lazy::new(|| Selector::parse("[style]").unwrap());

const IMG_SOURCE_ATTRS: [&str; 3] = ["src", "data-src", "data-original"];

/// Find the element holding the article body.
fn content_container(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&DIV)
        .find(|div| div.value().classes().any(|c| CONTENT_CLASS.is_match(c)))
        .or_else(|| document.select(&ARTICLE).next())
        .or_else(|| document.select(&MAIN).next())
}

/// Resolve an image source against the article URL.
///
/// Returns the candidate text together with its parsed form. Absolute sources
/// keep their original text; only relative ones take the resolved form.
fn resolve_source(base: &Url, src: &str) -> Option<(String, Url)> {
    match Url::parse(src) {
        Ok(url) => Some((src.to_string(), url)),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let url = base.join(src).ok()?;
            Some((url.to_string(), url))
        }
        Err(e) => {
            debug!(%src, error = %e, "Unparseable image source");
            None
        }
    }
}

/// List every usable image in an article page, best candidate first.
///
/// `<img>` candidates precede background-image candidates. Relative sources
/// are resolved against `base`. An empty list means "no image", which is not
/// an error.
pub fn find_image_candidates(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(container) = content_container(&document) else {
        debug!("No content container found");
        return Vec::new();
    };

    let mut candidates = Vec::new();

    for img in container.select(&IMG) {
        let src = IMG_SOURCE_ATTRS
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty());
        let Some(src) = src else {
            continue;
        };
        if is_rejected_image_url(src) {
            debug!(%src, "Skipping placeholder image");
            continue;
        }
        if let Some((text, _)) = resolve_source(base, src) {
            candidates.push(text);
        }
    }

    for styled in container.select(&STYLED) {
        let Some(style) = styled.value().attr("style") else {
            continue;
        };
        if !style.contains("background-image") {
            continue;
        }
        for cap in BACKGROUND_URL.captures_iter(style) {
            let raw = cap[1].trim();
            if is_rejected_image_url(raw) {
                continue;
            }
            let Some((text, resolved)) = resolve_source(base, raw) else {
                continue;
            };
            if matches!(resolved.scheme(), "http" | "https") {
                candidates.push(text);
            }
        }
    }

    candidates
}

/// Fetch an article page and list its featured image candidates.
///
/// # Errors
///
/// Network failures and non-success statuses. A page without a usable image
/// returns `Ok` with an empty list.
#[instrument(level = "info", skip_all, fields(%article_url))]
pub async fn locate_image_candidates(
    client: &Client,
    article_url: &str,
) -> Result<Vec<String>, Box<dyn Error>> {
    let base = Url::parse(article_url)?;
    let body = client
        .get(base.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let candidates = find_image_candidates(&body, &base);
    info!(count = candidates.len(), bytes = body.len(), "Scanned article page");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::test_server::{Route, serve};
    use crate::scrapers::{DEFAULT_USER_AGENT, build_client};
    use std::time::Duration;

    fn base() -> Url {
        Url::parse("https://note.com/someone/n/n0123456789ab").unwrap()
    }

    fn urls(html: &str) -> Vec<String> {
        find_image_candidates(html, &base())
    }

    #[test]
    fn test_first_img_in_note_body() {
        let html = r#"<html><body>
            <header><img src="/header-logo.png"></header>
            <div class="o-noteContentText note-body">
                <p>intro</p>
                <img src="https://assets.st-note.com/img/first.png">
                <img src="https://assets.st-note.com/img/second.png">
            </div></body></html>"#;
        assert_eq!(
            urls(html),
            vec![
                "https://assets.st-note.com/img/first.png",
                "https://assets.st-note.com/img/second.png",
            ]
        );
    }

    #[test]
    fn test_class_pattern_is_case_insensitive() {
        let html = r#"<div class="Article-Body"><img src="pic.jpg"></div>"#;
        assert_eq!(urls(html), vec!["https://note.com/someone/n/pic.jpg"]);
    }

    #[test]
    fn test_falls_back_to_article_then_main() {
        let article = r#"<main><img src="/main.png"></main><article><img src="/article.png"></article>"#;
        assert_eq!(urls(article), vec!["https://note.com/article.png"]);

        let main = r#"<div class="sidebar"><img src="/side.png"></div><main><img src="/main.png"></main>"#;
        assert_eq!(urls(main), vec!["https://note.com/main.png"]);
    }

    #[test]
    fn test_no_container_means_no_image() {
        let html = r#"<div class="sidebar"><img src="/side.png"></div>"#;
        assert!(urls(html).is_empty());
    }

    #[test]
    fn test_lazy_load_attributes_and_filters() {
        let html = r#"<article>
            <img src="data:image/gif;base64,R0lGOD">
            <img src="https://assets.st-note.com/poc-image/manual/note_empty_ogp.png">
            <img src="/img/user-icon.png">
            <img src="" data-src="https://cdn.example.com/lazy.webp">
            <img data-original="https://cdn.example.com/orig.jpg">
        </article>"#;
        assert_eq!(
            urls(html),
            vec![
                "https://cdn.example.com/lazy.webp",
                "https://cdn.example.com/orig.jpg",
            ]
        );
    }

    #[test]
    fn test_data_src_is_ignored_when_src_is_placeholder() {
        // src wins even when it is rejected; the lazy attribute is only a fallback
        let html = r#"<article><img src="data:image/gif;base64,R0" data-src="https://cdn.example.com/real.png"></article>"#;
        assert!(urls(html).is_empty());
    }

    #[test]
    fn test_background_image_fallback() {
        let html = r#"<div class="note-content">
            <div style="color: red"></div>
            <div style="background-image: url('https://cdn.example.com/icon-bg.png')"></div>
            <div style="background-image: url(&quot;https://cdn.example.com/hero.jpg&quot;)"></div>
            <figure style="background-image:url(/relative/bg.png)"></figure>
        </div>"#;
        assert_eq!(
            urls(html),
            vec![
                "https://cdn.example.com/hero.jpg",
                "https://note.com/relative/bg.png",
            ]
        );
    }

    #[test]
    fn test_absolute_sources_keep_their_exact_text() {
        let html = r#"<article>
            <img src="https://CDN.Example.com?id=7">
            <img src="https://cdn.example.com/img/画像.png">
            <img src="/uploads/my photo.png">
        </article>"#;
        assert_eq!(
            urls(html),
            vec![
                "https://CDN.Example.com?id=7",
                "https://cdn.example.com/img/画像.png",
                "https://note.com/uploads/my%20photo.png",
            ]
        );
    }

    #[test]
    fn test_img_candidates_come_before_backgrounds() {
        let html = r#"<article>
            <div style="background-image: url(https://cdn.example.com/bg.png)"></div>
            <img src="https://cdn.example.com/inline.png">
        </article>"#;
        assert_eq!(
            urls(html),
            vec![
                "https://cdn.example.com/inline.png",
                "https://cdn.example.com/bg.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_locate_fetches_and_resolves() {
        let page = br#"<html><body><article><img src="/images/cover.png"></article></body></html>"#;
        let (base_url, _) = serve(vec![Route {
            path: "/n/abc",
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: page.to_vec(),
        }])
        .await;
        let client = build_client(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();

        let found = locate_image_candidates(&client, &format!("{base_url}/n/abc"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_str(), format!("{base_url}/images/cover.png"));
    }

    #[tokio::test]
    async fn test_locate_reports_http_errors() {
        let (base_url, _) = serve(vec![]).await;
        let client = build_client(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        assert!(
            locate_image_candidates(&client, &format!("{base_url}/missing"))
                .await
                .is_err()
        );
    }
}
