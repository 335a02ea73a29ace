//! Table-of-contents sidebar built from the headings of a rendered page.

use regex::Regex;
use std::sync::LazyLock;

use crate::html::{escape_html, strip_tags};

pub const WITH_SIDEBAR: &str = "with-sidebar";
pub const NO_SIDEBAR: &str = "no-sidebar";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])(\s[^>]*)?>(.*?)</h([1-6])\s*>").unwrap());
static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidebar {
    pub headings: Vec<Heading>,
    pub markup: String,
    pub toggle: String,
    /// `with-sidebar` reserves the sidebar margin, `no-sidebar` renders full width.
    pub layout_class: &'static str,
}

impl Sidebar {
    pub fn empty() -> Self {
        Sidebar {
            headings: Vec::new(),
            markup: String::new(),
            toggle: String::new(),
            layout_class: NO_SIDEBAR,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

/// Headings in document order. Headings without a non-empty `id` are skipped.
pub fn extract_headings(html: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(html)
        .filter(|caps| caps[1] == caps[4])
        .filter_map(|caps| {
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            let id = ID_ATTR.captures(attrs).and_then(|id| {
                id.get(1)
                    .or_else(|| id.get(2))
                    .or_else(|| id.get(3))
                    .map(|m| m.as_str().trim().to_string())
            })?;
            if id.is_empty() {
                return None;
            }
            Some(Heading {
                level: caps[1].parse().ok()?,
                text: strip_tags(&caps[3]),
                id,
            })
        })
        .collect()
}

pub fn build_sidebar(html: &str) -> Sidebar {
    let headings = extract_headings(html);
    if headings.is_empty() {
        return Sidebar::empty();
    }

    let mut markup = String::from(
        "<aside id=\"toc-sidebar\" class=\"toc-sidebar\">\n<nav aria-label=\"Table of contents\">\n<ul class=\"toc-list\">\n",
    );
    for heading in &headings {
        markup.push_str(&format!(
            "<li class=\"toc-item toc-level-{}\"><a href=\"#{}\">{}</a></li>\n",
            heading.level,
            escape_html(&heading.id),
            escape_html(&heading.text)
        ));
    }
    markup.push_str("</ul>\n</nav>\n</aside>");

    Sidebar {
        headings,
        markup,
        toggle: "<button type=\"button\" class=\"sidebar-toggle\" aria-controls=\"toc-sidebar\" aria-expanded=\"false\" aria-label=\"Toggle table of contents\">&#9776;</button>".to_string(),
        layout_class: WITH_SIDEBAR,
    }
}
