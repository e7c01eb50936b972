//! Command-line interface definitions.
//!
//! Every option has a default, so running the binary with no flags from the
//! site root processes `note_articles.json` against the usual layout. Options
//! can also come from environment variables.

use crate::scrapers::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # From the site root
/// note_featured
///
/// # Somewhere else, with a YAML article list
/// note_featured --site-root ../site --articles articles.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site root holding blog/, img/, blog.html and index.html
    #[arg(short, long, env = "SITE_ROOT", default_value = ".")]
    pub site_root: PathBuf,

    /// Article list (JSON, or YAML by extension); relative paths are resolved
    /// against the site root
    #[arg(short, long, env = "NOTE_ARTICLES", default_value = "note_articles.json")]
    pub articles: PathBuf,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[arg(long, env = "FETCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Cli {
    /// The article list path, resolved against the site root.
    pub fn articles_path(&self) -> PathBuf {
        self.site_root.join(&self.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["note_featured"]);
        assert_eq!(cli.site_root, PathBuf::from("."));
        assert_eq!(cli.articles, PathBuf::from("note_articles.json"));
        assert_eq!(cli.timeout_secs, 15);
        assert_eq!(cli.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cli.articles_path(), PathBuf::from("./note_articles.json"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["note_featured", "-s", "/srv/site", "-a", "list.yaml"]);
        assert_eq!(cli.articles_path(), PathBuf::from("/srv/site/list.yaml"));
    }

    #[test]
    fn test_absolute_articles_path_wins() {
        let cli = Cli::parse_from(["note_featured", "--site-root", "/srv/site", "--articles", "/tmp/a.json"]);
        assert_eq!(cli.articles_path(), PathBuf::from("/tmp/a.json"));
    }
}
