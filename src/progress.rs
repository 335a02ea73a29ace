//! Progress-tracker pages: Markdown task lists become persistent checkboxes.
//!
//! Ids are derived from the item's link target (or its text when it has no
//! link), so a browser-side store keyed by id survives rebuilds and reordering.

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::config::{PageConfig, SiteConfig};
use crate::html::escape_html;
use crate::markdown::map_outside_fences;
use crate::site_map::ContentFile;

static TASK_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[-*+] \[( |x|X)\] (.*)$").unwrap());
static FIRST_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)[^)]*\)").unwrap());

const ID_HEX_LEN: usize = 12;

pub fn is_progress_page(file: &ContentFile, site: &SiteConfig, page: &PageConfig) -> bool {
    page.progress.unwrap_or_else(|| site.is_progress_stem(&file.stem()))
}

/// `progress-` followed by the first 12 hex digits of the SHA-256 of `key`.
pub fn checkbox_id(key: &str) -> String {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("progress-{}", &digest[..ID_HEX_LEN])
}

/// Rewrites every `- [ ]` / `- [x]` item of `markdown` into a checkbox with a label.
/// The item text stays Markdown so its links are still rewritten and rendered.
/// Task lists inside fenced code are left alone.
pub fn render_checklist(markdown: &str) -> String {
    map_outside_fences(markdown, checklist_items)
}

fn checklist_items(markdown: &str) -> String {
    TASK_ITEM
        .replace_all(markdown, |caps: &Captures| {
            let indent = &caps[1];
            let checked = if caps[2].eq_ignore_ascii_case("x") { " checked" } else { "" };
            let rest = &caps[3];
            let key = FIRST_LINK
                .captures(rest)
                .map_or_else(|| rest.trim().to_string(), |link| link[1].to_string());
            let id = checkbox_id(&key);
            format!(
                "{indent}- <input type=\"checkbox\" class=\"progress-checkbox\" id=\"{id}\"{checked}> <label for=\"{id}\">{rest}</label>"
            )
        })
        .into_owned()
}

pub fn script_tag(src: &str) -> String {
    format!("<script src=\"{}\"></script>", escape_html(src))
}
