//! Local side of the pipeline: rewriting the site's HTML.
//!
//! # Submodules
//!
//! - [`article`]: puts the featured image into `blog/<slug>.html`
//! - [`cards`]: renders one listing card per article, tags included
//! - [`listing`]: regenerates the card grids of `blog.html` and `index.html`
//! - [`region`]: finds an anchored region in a page and replaces it
//!
//! # Site Layout
//!
//! ```text
//! site_root/
//! ├── blog.html              # listing page
//! ├── index.html             # home page, <section id="blog"> holds cards
//! ├── blog/
//! │   └── <slug>.html        # article pages, patched in place
//! └── img/blog/
//!     └── <filename>         # downloaded featured images
//! ```

pub mod article;
pub mod cards;
pub mod listing;
pub mod region;
