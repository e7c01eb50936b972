//! Listing page updates for `blog.html` and the blog section of `index.html`.
//!
//! Both pages carry the same marker comment followed by the card grid. The
//! grid's content is regenerated from the full article list on every run.

use super::cards::render_card;
use super::region::{Anchor, Scope, replace_region};
use crate::models::{Article, FeaturedImageMap};
use itertools::Itertools;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const CARD_GRID_CLASS: &str = "grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-8 mb-16";
const LISTING_MARKER: &str = "<!-- ブログ記事一覧";

/// The card grid of `blog.html`.
pub const BLOG_PAGE_ANCHOR: Anchor = Anchor {
    scope: None,
    marker: LISTING_MARKER,
    container_tag: "div",
    container_class: CARD_GRID_CLASS,
    closing_indent: "            ",
};

/// The card grid inside `<section id="blog">` of `index.html`.
pub const HOME_PAGE_ANCHOR: Anchor = Anchor {
    scope: Some(Scope { tag: "section", id: "blog" }),
    marker: LISTING_MARKER,
    container_tag: "div",
    container_class: CARD_GRID_CLASS,
    closing_indent: "                ",
};

/// Articles newest first; ties keep their list order.
pub fn sort_newest_first(articles: &[Article]) -> Vec<&Article> {
    articles
        .iter()
        .sorted_by(|a, b| b.published_at().cmp(&a.published_at()))
        .collect()
}

/// Render every card, newest first, with staggered delays.
pub fn render_cards(articles: &[Article], images: &FeaturedImageMap) -> String {
    sort_newest_first(articles)
        .into_iter()
        .enumerate()
        .map(|(i, article)| render_card(article, images.get(&article.slug).map(String::as_str), i))
        .collect()
}

/// Regenerate the card grid of one listing page in place.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn update_listing_page(
    path: &Path,
    anchor: &Anchor,
    articles: &[Article],
    images: &FeaturedImageMap,
) -> Result<(), Box<dyn Error>> {
    let html = fs::read_to_string(path).await?;
    let cards = render_cards(articles, images);
    let updated = replace_region(&html, anchor, &cards)?;
    fs::write(path, updated).await?;
    info!(cards = articles.len(), "Updated listing page");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(slug: &str, title: &str, date_obj: &str) -> Article {
        Article {
            title: title.to_string(),
            slug: slug.to_string(),
            url: format!("https://note.com/x/n/{slug}"),
            date: date_obj.to_string(),
            date_obj: date_obj.to_string(),
            excerpt: String::new(),
        }
    }

    const BLOG_HTML: &str = "<!DOCTYPE html>\n<html><body>\n    <main>\n            <!-- ブログ記事一覧 -->\n            <div class=\"grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-8 mb-16\">\n                <!-- Articles will be inserted here -->\n            </div>\n    </main>\n</body></html>\n";

    const INDEX_HTML: &str = "<html><body>\n<section id=\"hero\"><div>hi</div></section>\n<section id=\"blog\" class=\"py-20 bg-gray-50\">\n    <div class=\"container\">\n            <!-- ブログ記事一覧 -->\n            <div class=\"grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-8 mb-16\">\n                <article>old card<div>x</div></article>\n                </div>\n    </div>\n</section>\n</body></html>\n";

    #[test]
    fn test_newest_first_and_delays() {
        let articles = vec![
            article("older", "old", "2024-01-01"),
            article("newer", "new", "2024-06-01"),
        ];
        let html = render_cards(&articles, &FeaturedImageMap::new());

        let newer = html.find("blog/newer.html").unwrap();
        let older = html.find("blog/older.html").unwrap();
        assert!(newer < older);

        let second_start = html[..older].rfind("<article").unwrap();
        let first_card = &html[..second_start];
        assert!(!first_card.contains("transition-delay"));
        let second_card = &html[second_start..];
        assert!(second_card.contains("style=\"transition-delay: 100ms;\""));
    }

    #[test]
    fn test_equal_dates_keep_source_order() {
        let articles = vec![
            article("a", "a", "2024-03-01"),
            article("b", "b", "2024-03-01"),
            article("c", "c", "2024-05-01"),
        ];
        let order: Vec<&str> = sort_newest_first(&articles)
            .iter()
            .map(|a| a.slug.as_str())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cards_use_collected_images() {
        let articles = vec![article("with", "t", "2024-01-01"), article("without", "t", "2023-01-01")];
        let mut images = FeaturedImageMap::new();
        images.insert("with".to_string(), "../img/blog/w.png".to_string());
        let html = render_cards(&articles, &images);
        assert!(html.contains("src=\"../img/blog/w.png\""));
        assert_eq!(html.matches("📝").count(), 1);
    }

    #[tokio::test]
    async fn test_update_blog_page_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.html");
        fs::write(&path, BLOG_HTML).await.unwrap();
        let articles = vec![article("one", "AIの話", "2024-02-01")];
        let images = FeaturedImageMap::new();

        update_listing_page(&path, &BLOG_PAGE_ANCHOR, &articles, &images).await.unwrap();
        let first = fs::read_to_string(&path).await.unwrap();
        assert!(first.contains("blog/one.html"));
        assert!(!first.contains("Articles will be inserted here"));
        assert!(first.starts_with("<!DOCTYPE html>\n<html><body>\n    <main>\n            <!-- ブログ記事一覧 -->"));
        assert!(first.ends_with("            </div>\n    </main>\n</body></html>\n"));

        update_listing_page(&path, &BLOG_PAGE_ANCHOR, &articles, &images).await.unwrap();
        assert_eq!(fs::read_to_string(&path).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_update_home_page_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, INDEX_HTML).await.unwrap();
        let articles = vec![article("fresh", "新しい記事", "2024-02-01")];

        update_listing_page(&path, &HOME_PAGE_ANCHOR, &articles, &FeaturedImageMap::new())
            .await
            .unwrap();
        let out = fs::read_to_string(&path).await.unwrap();
        assert!(!out.contains("old card"));
        assert!(out.contains("blog/fresh.html"));
        assert!(out.contains("<section id=\"hero\"><div>hi</div></section>"));
        assert!(out.contains("</article>\n"));
        assert!(out.contains("                </div>\n    </div>\n</section>"));
    }

    #[tokio::test]
    async fn test_missing_anchor_leaves_page_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "<html><body>no blog</body></html>").await.unwrap();
        let result =
            update_listing_page(&path, &HOME_PAGE_ANCHOR, &[], &FeaturedImageMap::new()).await;
        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(&path).await.unwrap(),
            "<html><body>no blog</body></html>"
        );
    }
}
