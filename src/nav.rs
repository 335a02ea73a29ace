//! Header and breadcrumb fragments merged into the page template.

use crate::html::{escape_html, Context, TemplateEngine, FOOTER, HEADER};
use crate::config::{Section, SiteConfig};
use crate::error::RenderError;
use crate::paths::{Breadcrumb, NavigationLinks};

const SEPARATOR: &str = "<span class=\"breadcrumb-separator\">&rsaquo;</span>";

/// `Home › AWS › Current page`. The last crumb is the page itself and is not a link.
/// Empty for the site landing page, which has nothing above it.
pub fn breadcrumb_html(crumbs: &[Breadcrumb], current_title: &str, is_root_index: bool) -> String {
    if is_root_index {
        return String::new();
    }
    let mut items: Vec<String> = crumbs
        .iter()
        .map(|crumb| {
            format!(
                "<li><a href=\"{}\" class=\"breadcrumb-link\">{}</a></li>",
                escape_html(&crumb.url),
                escape_html(&crumb.text)
            )
        })
        .collect();
    items.push(format!(
        "<li aria-current=\"page\" class=\"breadcrumb-current\">{}</li>",
        escape_html(current_title)
    ));
    format!(
        "<nav class=\"breadcrumbs\" aria-label=\"Breadcrumb\">\n<ol class=\"breadcrumb-list\">\n{}\n</ol>\n</nav>",
        items.join(&format!("\n<li class=\"separator\" aria-hidden=\"true\">{SEPARATOR}</li>\n"))
    )
}

pub fn section_links_html(links: &NavigationLinks) -> String {
    links
        .sections
        .iter()
        .map(|section| {
            let class = if section.active { "nav-link active" } else { "nav-link" };
            format!(
                "                <li><a href=\"{}\" class=\"{class}\">{}</a></li>",
                escape_html(&section.href),
                escape_html(&section.brand_text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the header template for one page.
pub fn header_html(
    templates: &dyn TemplateEngine,
    links: &NavigationLinks,
    branding: &Section,
    sidebar_toggle: &str,
) -> Result<String, RenderError> {
    let mut context = Context::new();
    context.insert("sidebar_toggle".into(), sidebar_toggle.to_string());
    context.insert("home_link".into(), escape_html(&links.home));
    context.insert("brand_gradient".into(), escape_html(&branding.gradient));
    context.insert("brand_text".into(), escape_html(&branding.brand_text));
    context.insert("section_links".into(), section_links_html(links));
    context.insert("case_studies_link".into(), escape_html(&links.case_studies));
    context.insert("about_link".into(), escape_html(&links.about));
    templates.render(HEADER, &context)
}

pub fn footer_html(
    templates: &dyn TemplateEngine,
    site: &SiteConfig,
) -> Result<String, RenderError> {
    let mut context = Context::new();
    context.insert("site_name".into(), escape_html(&site.site_name));
    context.insert("site_description".into(), escape_html(&site.site_description));
    templates.render(FOOTER, &context)
}
