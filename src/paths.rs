//! Relative URLs, asset paths, breadcrumbs and canonical URLs.
//!
//! Everything here works on output paths (relative to the output root) and
//! never touches the filesystem. Links between pages are computed from the
//! directory of the linking page, so a site can be served from any prefix.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{AssetMode, Section, SiteConfig};
use crate::error::BuildError;
use crate::site_map::{ContentFile, ROOT_SECTION};

const INDEX_HTML: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLink {
    pub slug: String,
    pub brand_text: String,
    pub href: String,
    /// The linking page lives inside this section.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationLinks {
    pub home: String,
    pub sections: Vec<SectionLink>,
    pub about: String,
    pub case_studies: String,
    pub css: String,
    pub js: String,
    pub progress_js: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub text: String,
    pub url: String,
}

pub struct PathResolver<'a> {
    site: &'a SiteConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        PathResolver { site }
    }

    /// Path from the directory of `from` to `to`, or an error when the two
    /// cannot be related (one absolute, one relative).
    pub fn try_relative_path(&self, from: &Path, to: &Path) -> Result<String, BuildError> {
        let base = from.parent().unwrap_or(Path::new(""));
        match pathdiff::diff_paths(to, base) {
            Some(rel) => Ok(to_url(&rel)),
            None => Err(BuildError::PathResolution {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            }),
        }
    }

    /// Like `try_relative_path`, falling back to `to` itself with forward slashes.
    pub fn relative_path(&self, from: &Path, to: &Path) -> String {
        self.try_relative_path(from, to).unwrap_or_else(|e| {
            debug!("{e}; using {}", to.display());
            to_url(to)
        })
    }

    /// Link to the landing page of `dir`, always ending in `/`.
    pub fn relative_dir(&self, from: &Path, dir: &Path) -> String {
        let rel = self.relative_path(from, &dir.join(INDEX_HTML));
        match rel.strip_suffix(INDEX_HTML) {
            Some("") => "./".to_string(),
            Some(prefix) => prefix.to_string(),
            None => rel,
        }
    }

    /// `../` repeated once per directory between the output root and the page.
    pub fn root_prefix(&self, file: &ContentFile) -> String {
        "../".repeat(file.depth)
    }

    fn asset_prefix(&self, file: &ContentFile) -> String {
        match self.site.asset_mode {
            AssetMode::Mirrored if file.section != ROOT_SECTION => {
                "../".repeat(file.depth.saturating_sub(1))
            }
            _ => self.root_prefix(file),
        }
    }

    pub fn navigation_links(&self, file: &ContentFile) -> NavigationLinks {
        let prefix = self.root_prefix(file);
        let assets = format!("{}assets/", self.asset_prefix(file));
        let sections = self
            .site
            .sections
            .iter()
            .map(|section| SectionLink {
                slug: section.slug.clone(),
                brand_text: section.brand_text.clone(),
                href: self.relative_dir(&file.output, Path::new(&section.slug)),
                active: file.section == section.slug,
            })
            .collect();

        NavigationLinks {
            home: format!("{prefix}{INDEX_HTML}"),
            sections,
            about: format!("{prefix}{}", self.site.about_page),
            case_studies: format!("{prefix}{}", self.site.case_studies_page),
            css: format!("{assets}{}", self.site.stylesheet),
            js: format!("{assets}{}", self.site.script),
            progress_js: format!("{assets}{}", self.site.progress_script),
        }
    }

    /// Home, then one crumb per section directory on the way down to the page.
    pub fn breadcrumbs(&self, file: &ContentFile) -> Vec<Breadcrumb> {
        let mut crumbs = vec![Breadcrumb {
            text: self.site.home.brand_text.clone(),
            url: format!("{}{INDEX_HTML}", self.root_prefix(file)),
        }];
        let mut dir = PathBuf::new();
        let parents = file.output.parent().map(|p| p.iter()).into_iter().flatten();
        for component in parents {
            dir.push(component);
            if let Some(section) = component.to_str().and_then(|c| self.site.section(c)) {
                crumbs.push(Breadcrumb {
                    text: section.brand_text.clone(),
                    url: self.relative_dir(&file.output, &dir),
                });
            }
        }
        crumbs
    }

    pub fn canonical_url(&self, output: &Path) -> String {
        if output.file_name().is_some_and(|n| n == INDEX_HTML) {
            let parent = output.parent().map(to_url).unwrap_or_default();
            if parent.is_empty() {
                "/".to_string()
            } else {
                format!("/{parent}/")
            }
        } else {
            format!("/{}", to_url(output))
        }
    }

    /// Extensionless canonical URL, as listed in the sitemap.
    pub fn sitemap_location(&self, output: &Path) -> String {
        let canonical = self.canonical_url(output);
        match canonical.strip_suffix(".html") {
            Some(clean) => clean.to_string(),
            None => canonical,
        }
    }

    pub fn branding(&self, section: &str) -> &'a Section {
        self.site.section(section).unwrap_or(&self.site.home)
    }
}

fn to_url(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
