use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::BuildError;

/// Everything one build invocation needs. Handed to `SiteBuilder::new`; lives for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content root, e.g. `content/`.
    pub source: PathBuf,
    /// Output root. May contain `source`.
    pub target: PathBuf,
    /// Static asset directory copied to `<target>/assets`.
    pub assets: PathBuf,
    /// Optional directory overriding the built-in templates.
    pub templates: Option<PathBuf>,
    pub clean: bool,
    pub site: SiteConfig,
}

/// Where a page finds its stylesheet and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    /// One `assets/` folder at the output root.
    #[default]
    Shared,
    /// Every section carries its own `assets/` mirror.
    Mirrored,
}

/// A top-level content category with its own branding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Directory name under the output root, e.g. `aws`.
    pub slug: String,
    pub brand_text: String,
    pub gradient: String,
}

impl Section {
    fn new(slug: &str, brand_text: &str, gradient: &str) -> Self {
        Section {
            slug: slug.to_string(),
            brand_text: brand_text.to_string(),
            gradient: gradient.to_string(),
        }
    }
}

/// Files and directories a clean build may delete from the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        CleanConfig {
            files: ["index.html", "aboutme.html", "case_studies.html", "sitemap.xml", "robots.txt"]
                .map(String::from)
                .to_vec(),
            dirs: vec!["assets".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_name: String,
    pub site_description: String,
    pub site_url: String,
    pub default_keywords: Vec<String>,
    pub sections: Vec<Section>,
    /// Branding used outside every section.
    pub home: Section,
    pub about_page: String,
    pub case_studies_page: String,
    pub stylesheet: String,
    pub script: String,
    pub progress_script: String,
    pub asset_mode: AssetMode,
    /// Source directory whose files are emitted at the output root.
    pub pages_dir: String,
    /// File stems emitted as `index.html`. Matched case-insensitively.
    pub landing_pages: Vec<String>,
    /// File stems treated as progress tracker pages. Matched case-insensitively.
    pub progress_pages: Vec<String>,
    /// Subtrees committed as already-built HTML.
    pub prebuilt_dirs: Vec<String>,
    /// Directory names never walked.
    pub exclude_dirs: Vec<String>,
    /// Markdown renderer assigns slug ids to headings without an explicit one.
    pub heading_ids: bool,
    pub default_changefreq: String,
    pub clean: CleanConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            site_name: "Data Engineering Guides".to_string(),
            site_description:
                "Comprehensive data engineering concepts, services, and best practices across major cloud platforms."
                    .to_string(),
            site_url: "https://example.github.io".to_string(),
            default_keywords: ["data engineering", "cloud", "distributed systems"]
                .map(String::from)
                .to_vec(),
            sections: vec![
                Section::new("aws", "AWS", "gradient-aws"),
                Section::new("gcp", "GCP", "gradient-gcp"),
                Section::new("azure", "Azure", "gradient-azure"),
                Section::new("databricks", "Databricks", "gradient-databricks"),
                Section::new("sql", "SQL", "gradient-sql"),
                Section::new("learn_concepts", "Learn", "gradient-learn"),
            ],
            home: Section::new("", "Home", "gradient-text"),
            about_page: "aboutme.html".to_string(),
            case_studies_page: "case_studies.html".to_string(),
            stylesheet: "styles.css".to_string(),
            script: "scripts.js".to_string(),
            progress_script: "progress.js".to_string(),
            asset_mode: AssetMode::Shared,
            pages_dir: "pages".to_string(),
            landing_pages: ["README", "INDEX", "index"].map(String::from).to_vec(),
            progress_pages: vec!["PROGRESS".to_string()],
            prebuilt_dirs: vec!["learn_concepts".to_string()],
            exclude_dirs: ["templates", "components", "src", "venv", "node_modules"]
                .map(String::from)
                .to_vec(),
            heading_ids: true,
            default_changefreq: "weekly".to_string(),
            clean: CleanConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Reads a YAML site config. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<SiteConfig, BuildError> {
        if !path.exists() {
            return Ok(SiteConfig::default());
        }
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::from_yaml(&text).map_err(|e| BuildError::SiteConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_yaml(text: &str) -> Result<SiteConfig, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(SiteConfig::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn section(&self, slug: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.slug == slug)
    }

    pub fn is_landing_stem(&self, stem: &str) -> bool {
        self.landing_pages.iter().any(|l| l.eq_ignore_ascii_case(stem))
    }

    pub fn is_progress_stem(&self, stem: &str) -> bool {
        self.progress_pages.iter().any(|p| p.eq_ignore_ascii_case(stem))
    }
}

/// Optional per-page settings from a sidecar YAML file, a YAML page, or a trailing JSON block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub sidebar: Option<bool>,
    pub progress: Option<bool>,
    pub include_in_sitemap: Option<bool>,
    pub sitemap_priority: Option<f32>,
    pub sitemap_changefreq: Option<String>,
}

impl PageConfig {
    /// Fields set in `other` win.
    pub fn overlay(self, other: PageConfig) -> PageConfig {
        PageConfig {
            title: other.title.or(self.title),
            description: other.description.or(self.description),
            keywords: other.keywords.or(self.keywords),
            sidebar: other.sidebar.or(self.sidebar),
            progress: other.progress.or(self.progress),
            include_in_sitemap: other.include_in_sitemap.or(self.include_in_sitemap),
            sitemap_priority: other.sitemap_priority.or(self.sitemap_priority),
            sitemap_changefreq: other.sitemap_changefreq.or(self.sitemap_changefreq),
        }
    }
}

/// `getting-started_notes` -> `Getting Started Notes`.
pub fn default_title(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = SiteConfig::from_yaml("site_name: My Guides\nasset_mode: mirrored\n").unwrap();
        assert_eq!(config.site_name, "My Guides");
        assert_eq!(config.asset_mode, AssetMode::Mirrored);
        assert_eq!(config.sections.len(), 6);
        assert_eq!(config.pages_dir, "pages");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(SiteConfig::from_yaml("  \n").unwrap(), SiteConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = SiteConfig::load(Path::new("/definitely/not/here/site.yaml")).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(SiteConfig::from_yaml("sections: [unclosed").is_err());
    }

    #[test]
    fn test_landing_stems_ignore_case() {
        let config = SiteConfig::default();
        assert!(config.is_landing_stem("readme"));
        assert!(config.is_landing_stem("INDEX"));
        assert!(!config.is_landing_stem("intro"));
        assert!(config.is_progress_stem("progress"));
    }

    #[test]
    fn test_overlay_prefers_other() {
        let base = PageConfig {
            title: Some("Base".into()),
            description: Some("kept".into()),
            ..Default::default()
        };
        let top = PageConfig {
            title: Some("Top".into()),
            ..Default::default()
        };
        let merged = base.overlay(top);
        assert_eq!(merged.title.as_deref(), Some("Top"));
        assert_eq!(merged.description.as_deref(), Some("kept"));
    }

    #[test]
    fn test_default_title() {
        assert_eq!(default_title("getting-started_notes"), "Getting Started Notes");
        assert_eq!(default_title("s3"), "S3");
    }
}
