//! Featured image injection into local article pages.
//!
//! Article pages (`blog/<slug>.html`) have a `<header class="mb-8">` holding
//! the title and a `<p class="text-gray-500">` with the publication date. The
//! featured image goes right after that date paragraph. A header that already
//! has an `<img>` gets that image's attributes overwritten instead, so
//! re-running never stacks images.
//!
//! The page is parsed into a tree, patched, and serialized back. Attribute
//! quoting and whitespace inside tags may be normalized as a side effect.

use crate::utils::escape_html;
use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::{Html, Node, Selector};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Classes of the featured image in the article header.
pub const FEATURED_IMAGE_CLASS: &str = "w-full h-64 md:h-96 object-cover rounded-lg mb-6 shadow-lg";

/// `alt` used when the page has no `<h1>`.
pub const FALLBACK_ALT: &str = "記事画像";

static HEADER: Lazy<Selector> = Lazy::new(|| Selector::parse("header.mb-8").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static DATE_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p.text-gray-500").unwrap());

/// Build an `<img>` element with the given attributes, in order.
fn img_element(attrs: &[(String, String)]) -> Option<Element> {
    let mut markup = String::from("<img");
    for (name, value) in attrs {
        markup.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
    }
    markup.push('>');

    let fragment = Html::parse_fragment(&markup);
    fragment.select(&IMG).next().map(|img| img.value().clone())
}

/// Existing attributes with the featured-image ones overwritten in place and
/// any missing ones appended.
fn merged_attrs(existing: &Element, overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = existing
        .attrs()
        .map(|(name, value)| {
            let value = overrides
                .iter()
                .find(|(o, _)| o == name)
                .map_or(value, |(_, v)| v.as_str());
            (name.to_string(), value.to_string())
        })
        .collect();
    for (name, value) in overrides {
        if existing.attr(name).is_none() {
            attrs.push((name.clone(), value.clone()));
        }
    }
    attrs
}

/// Insert or update the featured image of an article page.
///
/// The image gets [`FEATURED_IMAGE_CLASS`], lazy loading, and the trimmed text
/// of the page's `<h1>` as `alt` ([`FALLBACK_ALT`] without one). A new image
/// goes right after the header's date paragraph, or at the end of the header
/// when there is none. An image already in the header keeps its position and
/// unrelated attributes; only `src`, `class`, `alt` and `loading` change.
///
/// # Arguments
///
/// * `html` - The article page as read from disk
/// * `image_src` - Site-relative image path, e.g. `../img/blog/cover.png`
///
/// # Returns
///
/// The re-serialized document, or `None` when the page has no
/// `<header class="mb-8">`.
///
/// # Examples
///
/// ```ignore
/// let page = r#"<header class="mb-8"><h1>Title</h1><p class="text-gray-500">d</p></header>"#;
/// let out = patch_article_html(page, "../img/blog/a.png").unwrap();
/// assert!(out.contains(r#"alt="Title""#));
/// ```
pub fn patch_article_html(html: &str, image_src: &str) -> Option<String> {
    let mut document = Html::parse_document(html);

    let header = document.select(&HEADER).next()?;
    let header_id = header.id();
    let existing = header.select(&IMG).next().map(|img| (img.id(), img.value().clone()));
    let date_paragraph = header.select(&DATE_PARAGRAPH).next().map(|p| p.id());

    let alt = document
        .select(&H1)
        .next()
        .map(|h1| h1.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| FALLBACK_ALT.to_string());

    let overrides = vec![
        ("src".to_string(), image_src.to_string()),
        ("class".to_string(), FEATURED_IMAGE_CLASS.to_string()),
        ("alt".to_string(), alt),
        ("loading".to_string(), "lazy".to_string()),
    ];

    match existing {
        Some((img_id, current)) => {
            debug!("Updating existing header image");
            let updated = img_element(&merged_attrs(&current, &overrides))?;
            *document.tree.get_mut(img_id)?.value() = Node::Element(updated);
        }
        None => {
            let img = Node::Element(img_element(&overrides)?);
            match date_paragraph {
                Some(p_id) => {
                    document.tree.get_mut(p_id)?.insert_after(img);
                }
                None => {
                    document.tree.get_mut(header_id)?.append(img);
                }
            }
        }
    }

    Some(document.html())
}

/// Patch `article_file` in place with the featured image at `image_src`.
///
/// Returns `Ok(false)` when the page lacks the expected header, leaving the
/// file untouched.
#[instrument(level = "info", skip_all, fields(file = %article_file.display(), %image_src))]
pub async fn add_featured_image(article_file: &Path, image_src: &str) -> Result<bool, Box<dyn Error>> {
    let html = fs::read_to_string(article_file).await?;
    let Some(patched) = patch_article_html(&html, image_src) else {
        warn!("No <header class=\"mb-8\"> in article page");
        return Ok(false);
    };
    fs::write(article_file, patched).await?;
    info!("Featured image written to article page");
    Ok(true)
}
