//! Listing card rendering.
//!
//! Tags are inferred from the article title with an ordered rule table. Each
//! rule whose keyword appears in the lowercased title appends its tags, and at
//! most [`MAX_CARD_TAGS`] of them are rendered. Rendering is pure: the same
//! article, image and position always give the same markup.

use crate::models::Article;
use crate::utils::escape_html;
use std::fmt::Write;

/// Maximum number of tag pills shown on a card.
pub const MAX_CARD_TAGS: usize = 3;

/// Delay step between consecutive cards for the staggered fade-in.
pub const CARD_DELAY_STEP_MS: usize = 100;

/// Title keywords → tags. Keywords are lowercase.
#[derive(Debug)]
pub struct TagRule {
    pub keywords: &'static [&'static str],
    pub tags: &'static [&'static str],
}

impl TagRule {
    fn matches(&self, title_lower: &str) -> bool {
        self.keywords.iter().any(|k| title_lower.contains(k))
    }
}

/// Evaluated top to bottom; every matching rule contributes.
pub static TAG_RULES: &[TagRule] = &[
    TagRule { keywords: &["ai", "生成ai"], tags: &["AI"] },
    TagRule { keywords: &["llm"], tags: &["LLM"] },
    TagRule { keywords: &["税理士", "転記"], tags: &["税理士", "業務効率化"] },
    TagRule { keywords: &["google", "gemini"], tags: &["Gemini CLI"] },
    TagRule { keywords: &["情報漏洩", "セキュリティ"], tags: &["情報漏洩対策", "セキュリティ"] },
    TagRule { keywords: &["旅行", "うどん"], tags: &["業務効率化", "Googleマップ"] },
    TagRule { keywords: &["読書", "本"], tags: &["AI活用"] },
    TagRule { keywords: &["パスポート"], tags: &["AI活用", "教育"] },
    TagRule { keywords: &["データ", "予測"], tags: &["AI活用", "データ分析"] },
];

/// Every tag the rules produce for `title`, in rule order, uncapped.
pub fn infer_tags(title: &str) -> Vec<&'static str> {
    let lower = title.to_lowercase();
    TAG_RULES
        .iter()
        .filter(|rule| rule.matches(&lower))
        .flat_map(|rule| rule.tags.iter().copied())
        .collect()
}

/// Tailwind classes for a tag pill.
pub fn tag_color_class(tag: &str) -> &'static str {
    match tag {
        "AI" | "AI活用" => "bg-purple-100 text-purple-700",
        "LLM" | "データ分析" => "bg-indigo-100 text-indigo-700",
        "業務効率化" => "bg-green-100 text-green-700",
        "税理士" => "bg-blue-100 text-blue-700",
        "情報漏洩対策" | "セキュリティ" => "bg-red-100 text-red-700",
        "Gemini CLI" => "bg-yellow-100 text-yellow-700",
        "Googleマップ" => "bg-orange-100 text-orange-700",
        "教育" => "bg-pink-100 text-pink-700",
        _ => "bg-gray-100 text-gray-700",
    }
}

const PLACEHOLDER_THUMBNAIL: &str = r#"<div class="w-full h-48 bg-gradient-to-br from-indigo-500 to-purple-600 flex items-center justify-center"><span class="text-white text-2xl font-bold">📝</span></div>"#;

/// Render one listing card.
///
/// The card links to `blog/<slug>.html` and shows the thumbnail, up to
/// [`MAX_CARD_TAGS`] tag pills, the date, the title and the excerpt. All text
/// taken from the article is HTML-escaped.
///
/// # Arguments
///
/// * `article` - The article the card stands for
/// * `image` - Site-relative featured image, or `None` for the gradient
///   placeholder thumbnail
/// * `position` - Index of the card in the listing; drives the
///   `transition-delay` style, which is left out for the first card
///
/// # Returns
///
/// The card markup, indented for the grid container.
///
/// # Examples
///
/// ```ignore
/// let html = render_card(&article, Some("../img/blog/a.png"), 2);
/// assert!(html.contains("transition-delay: 200ms;"));
/// ```
pub fn render_card(article: &Article, image: Option<&str>, position: usize) -> String {
    let title = escape_html(&article.title);

    let mut tags_html = String::new();
    for tag in infer_tags(&article.title).into_iter().take(MAX_CARD_TAGS) {
        write!(
            tags_html,
            "<span class=\"px-3 py-1 {} text-xs font-semibold rounded-full\">{}</span>\n                            ",
            tag_color_class(tag),
            tag
        )
        .unwrap();
    }

    let image_html = match image {
        Some(src) => format!(
            r#"<img src="{}" alt="{}" class="w-full h-48 object-cover">"#,
            escape_html(src),
            title
        ),
        None => PLACEHOLDER_THUMBNAIL.to_string(),
    };

    let delay_ms = position * CARD_DELAY_STEP_MS;
    let style = if delay_ms > 0 {
        format!(r#" style="transition-delay: {delay_ms}ms;""#)
    } else {
        String::new()
    };

    format!(
        r#"
                <article class="blog-card bg-white rounded-2xl border border-gray-200 shadow-lg overflow-hidden fade-in"{style}>
                    <a href="blog/{slug}.html" class="block">
                        {image_html}
                        <div class="p-6">
                            <div class="flex flex-wrap gap-2 mb-3">
                                {tags_html}
                            </div>
                            <h2 class="text-xl font-bold text-gray-900 mb-3 hover:text-indigo-600 transition-colors">
                                {title}
                            </h2>
                            <p class="text-sm text-gray-500 mb-4">{date}</p>
                            <p class="text-gray-600 leading-relaxed">
                                {excerpt}
                            </p>
                            <span class="inline-block mt-4 text-indigo-600 font-semibold hover:underline">続きを読む →</span>
                        </div>
                    </a>
                </article>
        "#,
        slug = escape_html(&article.slug),
        date = escape_html(&article.date),
        excerpt = escape_html(&article.excerpt),
    )
}
