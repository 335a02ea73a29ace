//! Shared fixtures for unit tests.

use std::{fs, path::Path};

use crate::config::{BuildConfig, SiteConfig};
use crate::site_map::{ContentFile, ContentFormat, SiteMap};

pub fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub fn build_config(source: &Path, target: &Path) -> BuildConfig {
    BuildConfig {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        assets: source.join("__no_assets__"),
        templates: None,
        clean: false,
        site: SiteConfig::default(),
    }
}

pub fn content_file(rel: &str) -> ContentFile {
    let format = match Path::new(rel).extension().and_then(|e| e.to_str()) {
        Some("yaml") => ContentFormat::Yaml,
        Some("html") => ContentFormat::Html,
        _ => ContentFormat::Markdown,
    };
    ContentFile::new(Path::new("/content"), Path::new(rel), format, &SiteConfig::default())
}

/// A known-file set built from relative source paths.
pub fn site_map(rels: &[&str]) -> SiteMap {
    let mut map = SiteMap::default();
    for rel in rels {
        map.insert(content_file(rel));
    }
    map
}
