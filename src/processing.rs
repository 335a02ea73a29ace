//! Turns one discovered content file into a finished HTML page.
//!
//! A page moves through load, link rewriting, rendering, sidebar and context
//! construction and template merging. The first failing step aborts the page
//! with a `PageError` naming that step; its siblings are unaffected.

use regex::Regex;
use std::{fs, path::Path, path::PathBuf, sync::LazyLock};
use tracing::{debug, trace, warn};

use crate::config::{default_title, BuildConfig, PageConfig};
use crate::error::{BuildError, PageError, RenderError, Stage};
use crate::html::{
    escape_html, extract_body, extract_title, strip_tags, Context, TemplateEngine, PAGE,
};
use crate::links::LinkRewriter;
use crate::markdown::{
    dedent, looks_like_markdown, normalize_markdown, split_json_metadata, MarkdownRenderer,
};
use crate::nav::{breadcrumb_html, footer_html, header_html};
use crate::paths::{Breadcrumb, NavigationLinks, PathResolver};
use crate::progress::{is_progress_page, render_checklist, script_tag};
use crate::seo::{get_last_modified_date, SitemapEntry, PAGE_PRIORITY, ROOT_PRIORITY};
use crate::sidebar::{build_sidebar, Sidebar};
use crate::site_map::{ContentFile, ContentFormat, SiteMap};

static FIRST_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").unwrap());

/// A finished page, ready to be written to `output` under the output root.
#[derive(Debug, Clone)]
pub struct AssembledPage {
    pub output: PathBuf,
    pub html: String,
    /// `None` when the page opted out of the sitemap.
    pub sitemap: Option<SitemapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Markdown(String),
    Html(String),
}

#[derive(Debug)]
struct LoadedPage {
    config: PageConfig,
    body: Body,
    /// `<title>` of a pre-built document.
    title_hint: Option<String>,
}

/// Everything the page template is filled from.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub body: String,
    pub links: NavigationLinks,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub canonical_url: String,
    pub sidebar: Sidebar,
    pub brand_text: String,
    pub brand_gradient: String,
    pub scripts: String,
    pub source_file: String,
    pub last_modified: String,
}

pub struct PageAssembler<'a> {
    config: &'a BuildConfig,
    resolver: &'a PathResolver<'a>,
    rewriter: LinkRewriter<'a>,
    renderer: &'a dyn MarkdownRenderer,
    templates: &'a dyn TemplateEngine,
}

impl<'a> PageAssembler<'a> {
    pub fn new(
        config: &'a BuildConfig,
        resolver: &'a PathResolver<'a>,
        site_map: &'a SiteMap,
        renderer: &'a dyn MarkdownRenderer,
        templates: &'a dyn TemplateEngine,
    ) -> Self {
        PageAssembler {
            config,
            resolver,
            rewriter: LinkRewriter::new(resolver, site_map),
            renderer,
            templates,
        }
    }

    pub fn assemble(&self, file: &ContentFile) -> Result<AssembledPage, PageError> {
        let fail = |stage| move |e: BuildError| PageError::new(&file.rel, stage, e);
        let reached = |stage: Stage| trace!("{}: {} done", file.rel.display(), stage);
        reached(Stage::Discovered);

        let loaded = self.load(file).map_err(fail(Stage::ContentLoaded))?;
        reached(Stage::ContentLoaded);
        let progress = is_progress_page(file, &self.config.site, &loaded.config);
        let body = self.rewrite(file, loaded.body, progress);
        reached(Stage::LinksRewritten);
        let html = self.render_body(file, body).map_err(fail(Stage::BodyRendered))?;
        reached(Stage::BodyRendered);
        let context = self.page_context(file, &loaded.config, loaded.title_hint, html, progress);
        let page_context = self
            .template_context(file, &context)
            .map_err(fail(Stage::ContextBuilt))?;
        reached(Stage::ContextBuilt);
        let html = self
            .templates
            .render(PAGE, &page_context)
            .map_err(|e| fail(Stage::Emitted)(e.into()))?;

        debug!("Assembled {} -> {}", file.rel.display(), file.output.display());
        Ok(AssembledPage {
            output: file.output.clone(),
            html,
            sitemap: self.sitemap_entry(file, &loaded.config, context.last_modified),
        })
    }

    fn load(&self, file: &ContentFile) -> Result<LoadedPage, BuildError> {
        let text = fs::read_to_string(&file.source).map_err(|e| BuildError::io(&file.source, e))?;
        match file.format {
            ContentFormat::Markdown => {
                let (body, json) = split_json_metadata(&normalize_markdown(&text));
                let sidecar = self.sidecar_config(file);
                let inline = json.map_or_else(PageConfig::default, |json| {
                    recover(&file.source, serde_json::from_str(&json).map_err(|e| e.to_string()))
                });
                Ok(LoadedPage {
                    config: sidecar.overlay(inline),
                    body: Body::Markdown(body),
                    title_hint: None,
                })
            }
            ContentFormat::Yaml => {
                let value: serde_yaml::Value =
                    serde_yaml::from_str(&text).map_err(RenderError::from)?;
                if !value.is_mapping() {
                    return Err(RenderError::UnsupportedFormat(format!(
                        "{}: a YAML page must be a mapping",
                        file.rel.display()
                    ))
                    .into());
                }
                let content = value.get("content").and_then(|c| c.as_str()).unwrap_or_default();
                let content = dedent(content);
                let parsed = serde_yaml::from_value(value).map_err(|e| e.to_string());
                let config = recover(&file.source, parsed);
                let body = if looks_like_markdown(&content) {
                    Body::Markdown(normalize_markdown(&content))
                } else {
                    Body::Html(content)
                };
                Ok(LoadedPage {
                    config,
                    body,
                    title_hint: None,
                })
            }
            ContentFormat::Html => Ok(LoadedPage {
                config: PageConfig::default(),
                body: Body::Html(extract_body(&text).to_string()),
                title_hint: extract_title(&text),
            }),
        }
    }

    /// `<stem>.yaml` (or `.yml`) next to a Markdown page.
    fn sidecar_config(&self, file: &ContentFile) -> PageConfig {
        let Some(path) = ["yaml", "yml"]
            .iter()
            .map(|ext| file.source.with_extension(ext))
            .find(|p| p.is_file())
        else {
            return PageConfig::default();
        };
        debug!("Page config for {} from {}", file.rel.display(), path.display());
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                if text.trim().is_empty() {
                    Ok(PageConfig::default())
                } else {
                    serde_yaml::from_str(&text).map_err(|e| e.to_string())
                }
            });
        recover(&path, parsed)
    }

    fn rewrite(&self, file: &ContentFile, body: Body, progress: bool) -> Body {
        match body {
            Body::Markdown(text) => {
                let text = if progress { render_checklist(&text) } else { text };
                Body::Markdown(self.rewriter.rewrite_links(&text, file))
            }
            Body::Html(html) => Body::Html(self.rewriter.rewrite_hrefs(&html, file)),
        }
    }

    fn render_body(&self, file: &ContentFile, body: Body) -> Result<String, BuildError> {
        match body {
            Body::Markdown(text) => {
                let html = self.renderer.render(&text)?;
                // reference-style links are only visible once serialized
                Ok(self.rewriter.rewrite_hrefs(&html, file))
            }
            Body::Html(html) => Ok(html),
        }
    }

    pub fn page_context(
        &self,
        file: &ContentFile,
        page: &PageConfig,
        title_hint: Option<String>,
        body: String,
        progress: bool,
    ) -> PageContext {
        let site = &self.config.site;
        let sidebar = if page.sidebar.unwrap_or(true) {
            build_sidebar(&body)
        } else {
            Sidebar::empty()
        };
        let title = page
            .title
            .clone()
            .or_else(|| first_h1(&body))
            .or(title_hint)
            .unwrap_or_else(|| default_title(&file.stem()));
        let links = self.resolver.navigation_links(file);
        let scripts = if progress { script_tag(&links.progress_js) } else { String::new() };
        let branding = self.resolver.branding(&file.section);

        PageContext {
            title,
            description: page.description.clone().unwrap_or_else(|| site.site_description.clone()),
            keywords: page.keywords.clone().unwrap_or_else(|| site.default_keywords.clone()),
            body,
            breadcrumbs: self.resolver.breadcrumbs(file),
            canonical_url: format!(
                "{}{}",
                site.site_url.trim_end_matches('/'),
                self.resolver.canonical_url(&file.output)
            ),
            sidebar,
            brand_text: branding.brand_text.clone(),
            brand_gradient: branding.gradient.clone(),
            scripts,
            links,
            source_file: file.rel.to_string_lossy().replace('\\', "/"),
            last_modified: get_last_modified_date(&file.source),
        }
    }

    /// Fills every page template placeholder, rendering the header and footer fragments.
    pub fn template_context(
        &self,
        file: &ContentFile,
        page: &PageContext,
    ) -> Result<Context, BuildError> {
        let site = &self.config.site;
        let branding = self.resolver.branding(&file.section);
        let header = header_html(self.templates, &page.links, branding, &page.sidebar.toggle)?;
        let footer = footer_html(self.templates, site)?;

        let mut context = Context::new();
        let mut set = |key: &str, value: String| {
            context.insert(key.to_string(), value);
        };
        set("title", escape_html(&page.title));
        set("site_name", escape_html(&site.site_name));
        set("description", escape_html(&page.description));
        set("keywords", escape_html(&page.keywords.join(", ")));
        set("content", page.body.clone());
        set("brand_text", escape_html(&page.brand_text));
        set("brand_gradient", escape_html(&page.brand_gradient));
        set("home_link", page.links.home.clone());
        for section in &page.links.sections {
            set(&format!("{}_link", section.slug), section.href.clone());
        }
        set("about_link", page.links.about.clone());
        set("case_studies_link", page.links.case_studies.clone());
        set("css_path", page.links.css.clone());
        set("js_path", page.links.js.clone());
        set("breadcrumbs", breadcrumb_html(&page.breadcrumbs, &page.title, file.is_root_index()));
        set("canonical_url", escape_html(&page.canonical_url));
        set("sidebar", page.sidebar.markup.clone());
        set("sidebar_toggle", page.sidebar.toggle.clone());
        set("layout_class", page.sidebar.layout_class.to_string());
        set("header", header);
        set("footer", footer);
        set("scripts", page.scripts.clone());
        set("source_file", escape_html(&page.source_file));
        set("last_modified", page.last_modified.clone());
        Ok(context)
    }

    fn sitemap_entry(
        &self,
        file: &ContentFile,
        page: &PageConfig,
        lastmod: String,
    ) -> Option<SitemapEntry> {
        if !page.include_in_sitemap.unwrap_or(true) {
            debug!("{} excluded from the sitemap", file.rel.display());
            return None;
        }
        let default_priority = if file.is_root_index() { ROOT_PRIORITY } else { PAGE_PRIORITY };
        Some(SitemapEntry {
            loc: self.resolver.sitemap_location(&file.output),
            lastmod,
            changefreq: page
                .sitemap_changefreq
                .clone()
                .unwrap_or_else(|| self.config.site.default_changefreq.clone()),
            priority: page.sitemap_priority.unwrap_or(default_priority).clamp(0.0, 1.0),
        })
    }
}

/// A malformed page config is reported and replaced by the defaults.
fn recover(path: &Path, parsed: Result<PageConfig, String>) -> PageConfig {
    parsed.unwrap_or_else(|message| {
        let error = BuildError::ConfigLoad {
            path: path.to_path_buf(),
            message,
        };
        warn!("{error}; using defaults");
        PageConfig::default()
    })
}

fn first_h1(html: &str) -> Option<String> {
    FIRST_H1
        .captures(html)
        .map(|caps| strip_tags(&caps[1]))
        .filter(|t| !t.is_empty())
}
