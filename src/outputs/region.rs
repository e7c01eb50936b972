//! Anchored region replacement for hand-authored HTML pages.
//!
//! A region is the inner content of the first container element that follows
//! a marker comment, optionally searched only inside a scope element such as
//! `<section id="blog">`. The container's end is its *matching* closing tag,
//! found by counting nesting depth, so regions holding nested `<div>`s are
//! replaced whole. Everything outside the region is kept byte for byte.
//!
//! Replacing a region is idempotent: the first run fills an empty placeholder
//! and every later run swaps out what the previous run wrote.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt;

static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());
static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\sid\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

/// Element that bounds the search for the marker.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub tag: &'static str,
    pub id: &'static str,
}

/// Where a generated block lives inside a page.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub scope: Option<Scope>,
    /// Prefix of the marker comment, e.g. `<!-- ブログ記事一覧`.
    pub marker: &'static str,
    pub container_tag: &'static str,
    /// Exact class list of the container (whitespace-insensitive).
    pub container_class: &'static str,
    /// Placed between the new content and the container's closing tag.
    pub closing_indent: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegionError {
    ScopeNotFound { tag: String, id: String },
    MarkerNotFound(String),
    ContainerNotFound { tag: String, class: String },
    Unclosed(String),
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScopeNotFound { tag, id } => write!(f, "no <{tag} id=\"{id}\"> element"),
            Self::MarkerNotFound(marker) => write!(f, "marker '{marker}' not found"),
            Self::ContainerNotFound { tag, class } => {
                write!(f, "no <{tag} class=\"{class}\"> after the marker")
            }
            Self::Unclosed(tag) => write!(f, "<{tag}> container is never closed"),
        }
    }
}

impl Error for RegionError {}

/// Opening/closing tags of one element name, with comments matched first so
/// that markup inside comments is skipped.
fn tag_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<!--.*?-->|<(/?){}\b[^>]*>", regex::escape(tag)))
        .expect("escaped tag name is a valid pattern")
}

/// One opening or closing tag found in the document.
struct TagMatch<'a> {
    start: usize,
    end: usize,
    closing: bool,
    text: &'a str,
}

/// Tags of `pattern` in `html[from..to]`, comments excluded.
fn tags<'a>(
    html: &'a str,
    pattern: &'a Regex,
    from: usize,
    to: usize,
) -> impl Iterator<Item = TagMatch<'a>> + 'a {
    pattern
        .captures_iter(&html[from..to])
        .filter(|c| !c[0].starts_with("<!--"))
        .map(move |c| {
            let m = c.get(0).expect("group 0 always matches");
            TagMatch {
                start: from + m.start(),
                end: from + m.end(),
                closing: c.get(1).is_some_and(|g| g.as_str() == "/"),
                text: m.as_str(),
            }
        })
}

fn attr<'a>(re: &Regex, tag_text: &'a str) -> Option<&'a str> {
    let caps = re.captures(tag_text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

fn same_class_list(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

/// Start of the closing tag that matches an element opened just before
/// `from`, and the end of that closing tag.
fn matching_close(html: &str, pattern: &Regex, from: usize, to: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for tag in tags(html, pattern, from, to) {
        if tag.closing {
            depth -= 1;
            if depth == 0 {
                return Some((tag.start, tag.end));
            }
        } else if !tag.text.ends_with("/>") {
            depth += 1;
        }
    }
    None
}

/// Byte range `[open_start, close_end)` of the scope element.
fn scope_bounds(html: &str, scope: &Scope) -> Result<(usize, usize), RegionError> {
    let pattern = tag_pattern(scope.tag);
    let not_found = || RegionError::ScopeNotFound {
        tag: scope.tag.to_string(),
        id: scope.id.to_string(),
    };

    let open = tags(html, &pattern, 0, html.len())
        .find(|t| !t.closing && attr(&ID_ATTR, t.text) == Some(scope.id))
        .ok_or_else(not_found)?;
    let (_, close_end) = matching_close(html, &pattern, open.end, html.len())
        .ok_or_else(|| RegionError::Unclosed(scope.tag.to_string()))?;
    Ok((open.start, close_end))
}

/// Replace the inner content of the anchored container.
///
/// The marker comment is located first (inside the anchor's scope element
/// when one is set). The search for the container starts right after the
/// marker, and its region runs from the end of its opening tag to the start
/// of its matching closing tag.
///
/// # Arguments
///
/// * `html` - The whole page
/// * `anchor` - Marker, container and optional scope to look for
/// * `content` - New inner content, already indented
///
/// # Returns
///
/// The page with the region set to `"\n" + content + closing_indent`, all
/// other bytes untouched.
///
/// # Errors
///
/// [`RegionError`] when the scope, marker or container is missing, or when
/// the container (or scope) is never closed. The caller keeps the page as is.
///
/// # Examples
///
/// ```ignore
/// let page = "<!-- list -->\n<div class=\"grid\">\n  old\n</div>";
/// // anchor.closing_indent == ""
/// let out = replace_region(page, &anchor, "  new\n")?;
/// assert_eq!(out, "<!-- list -->\n<div class=\"grid\">\n  new\n</div>");
/// ```
pub fn replace_region(html: &str, anchor: &Anchor, content: &str) -> Result<String, RegionError> {
    let (lo, hi) = match &anchor.scope {
        Some(scope) => scope_bounds(html, scope)?,
        None => (0, html.len()),
    };

    let marker_at = html[lo..hi]
        .find(anchor.marker)
        .map(|i| lo + i)
        .ok_or_else(|| RegionError::MarkerNotFound(anchor.marker.to_string()))?;

    // search from the end of the marker comment, not from inside it
    let after_marker = marker_at + anchor.marker.len();
    let search_from = match html[after_marker..hi].find("-->") {
        Some(i) if anchor.marker.starts_with("<!--") => after_marker + i + 3,
        _ => after_marker,
    };

    let pattern = tag_pattern(anchor.container_tag);
    let container = tags(html, &pattern, search_from, hi)
        .filter(|t| !t.closing)
        .find(|t| attr(&CLASS_ATTR, t.text).is_some_and(|c| same_class_list(c, anchor.container_class)))
        .ok_or_else(|| RegionError::ContainerNotFound {
            tag: anchor.container_tag.to_string(),
            class: anchor.container_class.to_string(),
        })?;

    let (close_start, _) = matching_close(html, &pattern, container.end, hi)
        .ok_or_else(|| RegionError::Unclosed(anchor.container_tag.to_string()))?;

    let mut out = String::with_capacity(html.len() + content.len());
    out.push_str(&html[..container.end]);
    out.push('\n');
    out.push_str(content);
    out.push_str(anchor.closing_indent);
    out.push_str(&html[close_start..]);
    Ok(out)
}
