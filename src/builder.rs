use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::{AssetMode, BuildConfig};
use crate::error::{BuildError, PageError, Stage};
use crate::html::Templates;
use crate::io::{clean_output, copy_assets, smart_copy_file, write_if_changed, WriteStatus};
use crate::markdown::MarkdownRenderer;
use crate::paths::PathResolver;
use crate::processing::PageAssembler;
use crate::seo::{robots_txt, sitemap_xml, SitemapEntry};
use crate::site_map::build_site_map;

/// What one build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output paths of every emitted page, relative to the output root.
    pub pages: Vec<PathBuf>,
    /// Failed pages, and passthrough files that could not be copied.
    pub errors: Vec<PageError>,
    /// Asset and passthrough files copied because they were new or changed.
    pub copied: usize,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct SiteBuilder {
    config: BuildConfig,
    renderer: Box<dyn MarkdownRenderer>,
    templates: Templates,
}

impl SiteBuilder {
    pub fn new(
        config: BuildConfig,
        renderer: Box<dyn MarkdownRenderer>,
        templates: Templates,
    ) -> Self {
        SiteBuilder {
            config,
            renderer,
            templates,
        }
    }

    /// Runs a full build. Only setup failures (assets, discovery, sitemap) are
    /// returned as `Err`; page failures are collected in the report.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let config = &self.config;
        let target = &config.target;
        info!("Building {} -> {}", config.source.display(), target.display());
        std::fs::create_dir_all(target).map_err(|e| BuildError::io(target, e))?;

        if config.clean {
            clean_output(config)?;
        }

        let mut report = BuildReport::default();
        report.copied += self.copy_assets()?;

        let discovery = build_site_map(config)?;
        info!(
            "Discovered {} pages and {} passthrough files",
            discovery.site_map.len(),
            discovery.passthrough.len()
        );

        let resolver = PathResolver::new(&config.site);
        let assembler = PageAssembler::new(
            config,
            &resolver,
            &discovery.site_map,
            self.renderer.as_ref(),
            &self.templates,
        );

        let mut sitemap: Vec<SitemapEntry> = Vec::new();
        for file in discovery.site_map.files() {
            let page = match assembler.assemble(file) {
                Ok(page) => page,
                Err(e) => {
                    error!("{e}");
                    report.errors.push(e);
                    continue;
                }
            };
            let path = target.join(&page.output);
            match write_if_changed(&path, page.html.as_bytes()) {
                Ok(status) => {
                    if status == WriteStatus::Written {
                        debug!("Converted: {} -> {}", file.rel.display(), page.output.display());
                    }
                    sitemap.extend(page.sitemap);
                    report.pages.push(page.output);
                }
                Err(e) => {
                    let e = PageError::new(&file.rel, Stage::Emitted, e);
                    error!("{e}");
                    report.errors.push(e);
                }
            }
        }

        for rel in &discovery.passthrough {
            let source = config.source.join(rel);
            match smart_copy_file(&source, &target.join(rel)) {
                Ok(WriteStatus::Written) => report.copied += 1,
                Ok(WriteStatus::Unchanged) => {}
                Err(e) => {
                    let e = PageError::new(rel, Stage::Emitted, e);
                    error!("{e}");
                    report.errors.push(e);
                }
            }
        }

        self.write_seo_files(&sitemap)?;

        info!(
            "Built {} pages, copied {} files, {} failed",
            report.pages.len(),
            report.copied,
            report.errors.len()
        );
        for e in &report.errors {
            error!("  {}: {}", e.path.display(), e.source);
        }
        Ok(report)
    }

    fn copy_assets(&self) -> Result<usize, BuildError> {
        let config = &self.config;
        if !config.assets.is_dir() {
            warn!("Asset directory {} not found; skipping asset copy", config.assets.display());
            return Ok(0);
        }
        let mut copied = copy_assets(&config.assets, &config.target.join("assets"))?;
        if config.site.asset_mode == AssetMode::Mirrored {
            for section in &config.site.sections {
                let dest = config.target.join(&section.slug).join("assets");
                copied += copy_assets(&config.assets, &dest)?;
            }
        }
        info!("Copied {} asset files", copied);
        Ok(copied)
    }

    fn write_seo_files(&self, entries: &[SitemapEntry]) -> Result<(), BuildError> {
        let site = &self.config.site;
        if entries.is_empty() {
            warn!("No pages marked for sitemap.xml generation.");
        }
        let sitemap_path = self.config.target.join("sitemap.xml");
        write_if_changed(&sitemap_path, sitemap_xml(entries, &site.site_url).as_bytes())?;
        let robots = robots_txt(&self.templates, &site.site_url)?;
        write_if_changed(&self.config.target.join("robots.txt"), robots.as_bytes())?;
        info!("Wrote sitemap with {} entries and robots.txt", entries.len());
        Ok(())
    }
}
