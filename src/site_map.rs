use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{BuildConfig, SiteConfig};
use crate::error::BuildError;

/// Section name for pages outside every configured section.
pub const ROOT_SECTION: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Markdown,
    Yaml,
    Html,
}

/// One page source discovered under the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    /// Absolute (or cwd-relative) path of the source file.
    pub source: PathBuf,
    /// Path relative to the content root, e.g. `aws/README.md`.
    pub rel: PathBuf,
    /// Path relative to the output root, e.g. `aws/index.html`.
    pub output: PathBuf,
    pub format: ContentFormat,
    pub section: String,
    /// Directories between the output root and the emitted file.
    pub depth: usize,
}

impl ContentFile {
    pub fn new(source_root: &Path, rel: &Path, format: ContentFormat, site: &SiteConfig) -> Self {
        let output = output_path(rel, format, site);
        let parts: Vec<&str> = output.iter().filter_map(|p| p.to_str()).collect();
        let depth = parts.len().saturating_sub(1);
        let section = match parts.first() {
            Some(first) if depth > 0 && site.section(first).is_some() => first.to_string(),
            _ => ROOT_SECTION.to_string(),
        };
        ContentFile {
            source: source_root.join(rel),
            rel: rel.to_path_buf(),
            output,
            format,
            section,
            depth,
        }
    }

    pub fn stem(&self) -> String {
        self.rel
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn is_root_index(&self) -> bool {
        self.output == Path::new("index.html")
    }
}

/// Maps a source path (relative to the content root) to its output path.
pub fn output_path(rel: &Path, format: ContentFormat, site: &SiteConfig) -> PathBuf {
    let stripped = rel.strip_prefix(&site.pages_dir).unwrap_or(rel);
    match format {
        ContentFormat::Html => stripped.to_path_buf(),
        ContentFormat::Markdown | ContentFormat::Yaml => {
            let stem = stripped.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if site.is_landing_stem(stem) {
                stripped.with_file_name("index.html")
            } else {
                stripped.with_extension("html")
            }
        }
    }
}

/// Normalizes `.` and `..` segments without touching the filesystem.
/// `None` when a `..` climbs above the root the path is relative to.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut components: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                components.pop()?;
            }
            Component::Normal(name) => components.push(name),
            _ => {}
        }
    }
    Some(components.iter().collect())
}

/// The known-file set: every page this build will itself produce, keyed by source path.
#[derive(Debug, Clone, Default)]
pub struct SiteMap {
    files: BTreeMap<PathBuf, ContentFile>,
    /// Output path -> source path, for duplicate detection.
    outputs: BTreeMap<PathBuf, PathBuf>,
    /// Sources that are not built themselves but stand for a page that is,
    /// e.g. the Markdown behind committed HTML.
    aliases: BTreeMap<PathBuf, PathBuf>,
}

impl SiteMap {
    pub fn insert(&mut self, file: ContentFile) -> bool {
        if let Some(existing) = self.outputs.get(&file.output) {
            warn!(
                "{} and {} both map to {}; keeping the first",
                existing.display(),
                file.rel.display(),
                file.output.display()
            );
            return false;
        }
        self.outputs.insert(file.output.clone(), file.rel.clone());
        self.files.insert(file.rel.clone(), file);
        true
    }

    /// Lets links to `from` resolve to the page built from `to`.
    pub fn alias(&mut self, from: PathBuf, to: PathBuf) -> bool {
        if self.files.contains_key(&from) || !self.files.contains_key(&to) {
            return false;
        }
        debug!("Alias {} -> {}", from.display(), to.display());
        self.aliases.insert(from, to);
        true
    }

    pub fn get(&self, rel: &Path) -> Option<&ContentFile> {
        self.files
            .get(rel)
            .or_else(|| self.aliases.get(rel).and_then(|to| self.files.get(to)))
    }

    pub fn files(&self) -> impl Iterator<Item = &ContentFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of walking the content root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub site_map: SiteMap,
    /// Non-page files copied verbatim, relative to the content root.
    pub passthrough: Vec<PathBuf>,
}

pub fn build_site_map(config: &BuildConfig) -> Result<Discovery, BuildError> {
    let site = &config.site;
    let root = &config.source;
    let target_inside_source = config.target != config.source && config.target.starts_with(root);
    let mut discovery = Discovery::default();
    let mut prebuilt_sources = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !skip_entry(e, site, config, target_inside_source));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            BuildError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        match classify(root, rel, site) {
            Some(format) => {
                let file = ContentFile::new(root, rel, format, site);
                debug!("Discovered {} -> {}", rel.display(), file.output.display());
                discovery.site_map.insert(file);
            }
            None if is_skipped_source(root, rel, site) => {
                debug!("Skipped source {}", rel.display());
                if in_prebuilt_dir(rel, site) {
                    prebuilt_sources.push(rel.to_path_buf());
                }
            }
            None => discovery.passthrough.push(rel.to_path_buf()),
        }
    }

    // links to the Markdown behind committed HTML resolve to that HTML
    for rel in prebuilt_sources {
        if let Some(html) = ["html", "htm"]
            .iter()
            .map(|ext| rel.with_extension(ext))
            .find(|html| discovery.site_map.get(html).is_some())
        {
            discovery.site_map.alias(rel, html);
        }
    }
    Ok(discovery)
}

fn skip_entry(
    entry: &DirEntry,
    site: &SiteConfig,
    config: &BuildConfig,
    target_inside_source: bool,
) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    if entry.file_type().is_dir() {
        if site.exclude_dirs.iter().any(|d| *d == name) {
            return true;
        }
        if target_inside_source && entry.path() == config.target {
            return true;
        }
    }
    false
}

fn in_prebuilt_dir(rel: &Path, site: &SiteConfig) -> bool {
    site.prebuilt_dirs.iter().any(|d| rel.starts_with(d))
}

fn extension(rel: &Path) -> String {
    rel.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn classify(root: &Path, rel: &Path, site: &SiteConfig) -> Option<ContentFormat> {
    let ext = extension(rel);
    if in_prebuilt_dir(rel, site) {
        return matches!(ext.as_str(), "html" | "htm").then_some(ContentFormat::Html);
    }
    match ext.as_str() {
        "md" | "markdown" => Some(ContentFormat::Markdown),
        "yaml" | "yml" if !is_sidecar(root, rel) => Some(ContentFormat::Yaml),
        "html" | "htm" if !is_generated(root, rel, site) => Some(ContentFormat::Html),
        _ => None,
    }
}

/// HTML emitted from a Markdown or YAML sibling by an earlier build into the same tree.
fn is_generated(root: &Path, rel: &Path, site: &SiteConfig) -> bool {
    let parent = rel.parent().unwrap_or(Path::new(""));
    let dirs = [root.join(parent), root.join(&site.pages_dir).join(parent)];
    let has_source = |stem: &str| {
        dirs.iter().any(|dir| {
            ["md", "markdown", "yaml", "yml"]
                .iter()
                .any(|ext| dir.join(stem).with_extension(ext).is_file())
        })
    };
    let stem = rel.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if stem == "index" {
        site.landing_pages.iter().any(|l| has_source(l))
    } else {
        has_source(stem)
    }
}

/// Page sources that are neither pages nor passthrough files.
fn is_skipped_source(root: &Path, rel: &Path, site: &SiteConfig) -> bool {
    match extension(rel).as_str() {
        "md" | "markdown" | "yaml" | "yml" => in_prebuilt_dir(rel, site) || is_sidecar(root, rel),
        "html" | "htm" => !in_prebuilt_dir(rel, site) && is_generated(root, rel, site),
        _ => false,
    }
}

/// A `.yaml` next to a same-stem `.md` configures that page instead of being one.
fn is_sidecar(root: &Path, rel: &Path) -> bool {
    let ext = extension(rel);
    matches!(ext.as_str(), "yaml" | "yml") && root.join(rel.with_extension("md")).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{build_config, write};
    use tempfile::TempDir;

    fn file(rel: &str, format: ContentFormat) -> ContentFile {
        ContentFile::new(Path::new("/content"), Path::new(rel), format, &SiteConfig::default())
    }

    #[test]
    fn test_markdown_maps_to_html() {
        let f = file("docs/a/b.md", ContentFormat::Markdown);
        assert_eq!(f.output, PathBuf::from("docs/a/b.html"));
        assert_eq!(f.depth, 2);
        assert_eq!(f.section, ROOT_SECTION);
    }

    #[test]
    fn test_readme_maps_to_index() {
        let f = file("docs/x/README.md", ContentFormat::Markdown);
        assert_eq!(f.output, PathBuf::from("docs/x/index.html"));
    }

    #[test]
    fn test_pages_dir_maps_to_root() {
        let f = file("pages/index.yaml", ContentFormat::Yaml);
        assert_eq!(f.output, PathBuf::from("index.html"));
        assert_eq!(f.depth, 0);
        assert!(f.is_root_index());
    }

    #[test]
    fn test_section_detection() {
        assert_eq!(file("aws/s3.md", ContentFormat::Markdown).section, "aws");
        // a root-level page named like a section is not inside it
        assert_eq!(file("aws.md", ContentFormat::Markdown).section, ROOT_SECTION);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("docs/a/../c.md")), Some(PathBuf::from("docs/c.md")));
        assert_eq!(normalize(Path::new("./x/./y.md")), Some(PathBuf::from("x/y.md")));
        assert_eq!(normalize(Path::new("docs/../../up.md")), None);
        assert_eq!(normalize(Path::new("../up.md")), None);
    }

    #[test]
    fn test_discovery_classifies_files() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(&content.join("aws/s3.md"), "# S3");
        write(&content.join("aws/s3.yaml"), "title: S3 Guide");
        write(&content.join("pages/index.yaml"), "content: hello");
        write(&content.join("learn_concepts/docs/intro.md"), "# Intro");
        write(&content.join("learn_concepts/docs/intro.html"), "<h1>Intro</h1>");
        write(&content.join("learn_concepts/assets/progress.js"), "//");
        write(&content.join("templates/page.html"), "x");
        write(&content.join(".hidden/x.md"), "x");
        write(&content.join("img/logo.png"), "png");

        let config = build_config(&content, &dir.path().join("out"));
        let discovery = build_site_map(&config).unwrap();
        let rels: Vec<String> = discovery
            .site_map
            .files()
            .map(|f| f.rel.to_string_lossy().to_string())
            .collect();
        assert_eq!(rels, vec!["aws/s3.md", "learn_concepts/docs/intro.html", "pages/index.yaml"]);
        assert_eq!(
            discovery.passthrough,
            vec![PathBuf::from("img/logo.png"), PathBuf::from("learn_concepts/assets/progress.js")]
        );
    }

    #[test]
    fn test_generated_html_is_not_a_page() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("aws/s3.md"), "# S3");
        write(&root.join("aws/s3.html"), "<p>old build</p>");
        write(&root.join("aws/README.md"), "# AWS");
        write(&root.join("aws/index.html"), "<p>old build</p>");
        write(&root.join("aws/diagram.html"), "<p>hand written</p>");
        write(&root.join("pages/aboutme.yaml"), "content: hi");
        write(&root.join("aboutme.html"), "<p>old build</p>");

        let discovery = build_site_map(&build_config(root, root)).unwrap();
        let rels: Vec<String> = discovery
            .site_map
            .files()
            .map(|f| f.rel.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            rels,
            vec!["aws/README.md", "aws/diagram.html", "aws/s3.md", "pages/aboutme.yaml"]
        );
        assert!(discovery.passthrough.is_empty());
    }

    #[test]
    fn test_prebuilt_markdown_aliases_its_html() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(&content.join("learn_concepts/docs/intro.md"), "# Intro");
        write(&content.join("learn_concepts/docs/intro.html"), "<h1>Intro</h1>");
        write(&content.join("learn_concepts/docs/draft.md"), "# Draft");

        let discovery = build_site_map(&build_config(&content, &dir.path().join("out"))).unwrap();
        let map = &discovery.site_map;
        assert_eq!(map.len(), 1);
        let page = map.get(Path::new("learn_concepts/docs/intro.md")).unwrap();
        assert_eq!(page.output, PathBuf::from("learn_concepts/docs/intro.html"));
        assert!(map.get(Path::new("learn_concepts/docs/draft.md")).is_none());
    }

    #[test]
    fn test_alias_needs_a_built_target() {
        let mut map = SiteMap::default();
        map.insert(file("a.md", ContentFormat::Markdown));
        assert!(!map.alias(PathBuf::from("b.md"), PathBuf::from("missing.html")));
        assert!(!map.alias(PathBuf::from("a.md"), PathBuf::from("a.md")));
        assert!(map.alias(PathBuf::from("c.md"), PathBuf::from("a.md")));
        assert_eq!(map.get(Path::new("c.md")).map(|f| f.rel.clone()), Some(PathBuf::from("a.md")));
    }

    #[test]
    fn test_duplicate_output_keeps_first() {
        let mut map = SiteMap::default();
        assert!(map.insert(file("x/README.md", ContentFormat::Markdown)));
        assert!(!map.insert(file("x/index.md", ContentFormat::Markdown)));
        assert_eq!(map.len(), 1);
    }
}
