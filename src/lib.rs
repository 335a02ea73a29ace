//! Static guide-site generator.
//!
//! Content files (Markdown, YAML and pre-built HTML) under a content root are
//! discovered into a [`site_map::SiteMap`], assembled one by one into full
//! pages by [`processing::PageAssembler`] and written by
//! [`builder::SiteBuilder`], which also copies assets and emits the sitemap
//! and robots file.

pub mod args;
pub mod builder;
pub mod config;
pub mod error;
pub mod html;
pub mod io;
pub mod links;
pub mod markdown;
pub mod nav;
pub mod paths;
pub mod processing;
pub mod progress;
pub mod seo;
pub mod sidebar;
pub mod site_map;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use builder::{BuildReport, SiteBuilder};
pub use config::{BuildConfig, SiteConfig};
pub use error::{BuildError, PageError, RenderError};
