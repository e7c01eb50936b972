//! Image download with a filename-based cache.
//!
//! Files land in the site's `img/blog/` directory and are referenced from
//! article pages as `../img/blog/<filename>`.
//!
//! # Naming
//!
//! - URL path ends in a basename with an extension → that basename,
//!   percent-decoded, with every character outside (Unicode) word characters,
//!   `.` and `-` replaced by `_`
//! - otherwise → `note_<first 8 hex of md5(url)><ext>`, the hash taken over the
//!   URL text exactly as given and the extension from the response
//!   `Content-Type`
//!
//! # Cache
//!
//! An existing file with the derived name is returned as is and no request is
//! made. For hash-derived names every possible extension is checked first.

use super::is_rejected_image_url;
use crate::utils::sanitize_filename;
use md5::{Digest, Md5};
use reqwest::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Directory of downloaded images as seen from `blog/<slug>.html`.
pub const SITE_IMAGE_PREFIX: &str = "../img/blog";

/// Extensions a hash-derived filename can end with.
const HASHED_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".webp"];

/// Site-relative path for a file in the image directory.
pub fn site_image_path(filename: &str) -> String {
    format!("{SITE_IMAGE_PREFIX}/{filename}")
}

/// The sanitized basename of the URL path, if it has an extension.
///
/// The segment is percent-decoded first so non-ASCII names and spaces reach
/// the sanitizer as written on the page (`画像.png` stays `画像.png`,
/// `my photo.png` becomes `my_photo.png`).
pub fn url_basename(url: &Url) -> Option<String> {
    let last = url.path_segments()?.last()?;
    let decoded = urlencoding::decode(last).map_or_else(|_| last.into(), |d| d.into_owned());
    if decoded.is_empty() || !decoded.contains('.') {
        return None;
    }
    Some(sanitize_filename(&decoded))
}

/// `note_<8 hex chars>` from the MD5 of the exact URL string.
pub fn hashed_stem(image_url: &str) -> String {
    let digest = format!("{:x}", Md5::digest(image_url.as_bytes()));
    format!("note_{}", &digest[..8])
}

/// Map a `Content-Type` value to a file extension, `.jpg` when unknown.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("jpeg") || ct.contains("jpg") {
        ".jpg"
    } else if ct.contains("png") {
        ".png"
    } else if ct.contains("gif") {
        ".gif"
    } else if ct.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

/// Name of an already-downloaded copy of `image_url`, if one exists.
fn cached_filename(url: &Url, image_url: &str, dest_dir: &Path) -> Option<String> {
    match url_basename(url) {
        Some(name) => dest_dir.join(&name).exists().then_some(name),
        None => {
            let stem = hashed_stem(image_url);
            HASHED_EXTENSIONS
                .iter()
                .map(|ext| format!("{stem}{ext}"))
                .find(|name| dest_dir.join(name).exists())
        }
    }
}

/// Download an image into `dest_dir`, reusing a copy already there.
///
/// The filename is derived before any request is made (see the module docs),
/// so an image downloaded by an earlier run costs no network round trip. A
/// body that fails mid-stream is removed again rather than left behind as a
/// truncated cache entry.
///
/// # Arguments
///
/// * `client` - Shared HTTP client (user agent and timeout already set)
/// * `image_url` - Candidate URL text; hash-derived names use it verbatim
/// * `dest_dir` - The site's image directory, created if missing
///
/// # Returns
///
/// The site-relative path `../img/blog/<filename>`, or `None` when the URL is
/// a placeholder or anything fails. Failures are logged, never propagated.
///
/// # Examples
///
/// ```ignore
/// let src = download_image(&client, "https://cdn.example.com/a/cover.png", &img_dir).await;
/// assert_eq!(src.as_deref(), Some("../img/blog/cover.png"));
/// ```
#[instrument(level = "info", skip_all, fields(%image_url))]
pub async fn download_image(client: &Client, image_url: &str, dest_dir: &Path) -> Option<String> {
    if is_rejected_image_url(image_url) {
        debug!("Refusing placeholder image");
        return None;
    }

    match fetch_to_disk(client, image_url, dest_dir).await {
        Ok(filename) => Some(site_image_path(&filename)),
        Err(e) => {
            error!(error = %e, "Image download failed");
            None
        }
    }
}

async fn fetch_to_disk(
    client: &Client,
    image_url: &str,
    dest_dir: &Path,
) -> Result<String, Box<dyn Error>> {
    let url = Url::parse(image_url)?;

    if let Some(existing) = cached_filename(&url, image_url, dest_dir) {
        info!(file = %existing, "Image already downloaded");
        return Ok(existing);
    }

    let mut response = client.get(url.clone()).send().await?.error_for_status()?;

    let filename = match url_basename(&url) {
        Some(name) => name,
        None => {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            format!(
                "{}{}",
                hashed_stem(image_url),
                extension_for_content_type(content_type)
            )
        }
    };

    fs::create_dir_all(dest_dir).await?;
    let path = dest_dir.join(&filename);
    let mut file = fs::File::create(&path).await?;

    let written = match stream_body(&mut response, &mut file).await {
        Ok(n) => n,
        Err(e) => {
            warn!(path = %path.display(), "Removing partial download");
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e);
        }
    };

    info!(file = %filename, bytes = written, "Saved image");
    Ok(filename)
}

/// Copy the response body into `file` chunk by chunk.
async fn stream_body(response: &mut Response, file: &mut fs::File) -> Result<usize, Box<dyn Error>> {
    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}
