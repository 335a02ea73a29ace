use chrono::{DateTime, Local};
use std::{fs, path::Path};
use tracing::warn;

use crate::error::RenderError;
use crate::html::{Context, TemplateEngine, ROBOTS};

pub const ROOT_PRIORITY: f32 = 0.8;
pub const PAGE_PRIORITY: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Site-rooted location, e.g. `/aws/s3`.
    pub loc: String,
    pub lastmod: String,
    pub changefreq: String,
    pub priority: f32,
}

/// `YYYY-MM-DD` of the file's modification time, or today when unavailable.
pub fn get_last_modified_date(path: &Path) -> String {
    let modified = fs::metadata(path).and_then(|m| m.modified());
    let date: DateTime<Local> = match modified {
        Ok(time) => time.into(),
        Err(e) => {
            warn!("Could not read modification time of {}: {}", path.display(), e);
            Local::now()
        }
    };
    date.format("%Y-%m-%d").to_string()
}

pub fn sitemap_xml(entries: &[SitemapEntry], base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut sorted: Vec<&SitemapEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.loc.cmp(&b.loc));

    let urls: Vec<String> = sorted
        .iter()
        .map(|entry| {
            format!(
                "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>",
                escape_xml(&format!("{base}{}", entry.loc)),
                escape_xml(&entry.lastmod),
                escape_xml(&entry.changefreq),
                entry.priority.clamp(0.0, 1.0)
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}\n</urlset>\n",
        urls.join("\n")
    )
}

pub fn robots_txt(templates: &dyn TemplateEngine, site_url: &str) -> Result<String, RenderError> {
    let mut context = Context::new();
    context.insert(
        "sitemap_url".into(),
        format!("{}/sitemap.xml", site_url.trim_end_matches('/')),
    );
    let mut robots = templates.render(ROBOTS, &context)?;
    if !robots.ends_with('\n') {
        robots.push('\n');
    }
    Ok(robots)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
