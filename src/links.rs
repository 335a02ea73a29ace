use regex::{Captures, Regex};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::{debug, warn};

use crate::markdown::map_outside_code;
use crate::paths::PathResolver;
use crate::site_map::{normalize, ContentFile, SiteMap};

/// `[text](target.md#anchor "title")`
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[(?P<text>[^\]]*)\]\((?P<target>[^)\s#]+\.md)(?P<anchor>#[^)\s]*)?(?P<title>\s+"[^"]*")?\)"#,
    )
    .unwrap()
});

/// `href="target.md#anchor"` with either quote style.
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"href="(?P<dq>[^"#]+\.md)(?P<dqa>#[^"]*)?"|href='(?P<sq>[^'#]+\.md)(?P<sqa>#[^']*)?'"##,
    )
    .unwrap()
});

/// Rewrites links between content files to the relative paths of their emitted pages.
pub struct LinkRewriter<'a> {
    resolver: &'a PathResolver<'a>,
    site_map: &'a SiteMap,
}

impl<'a> LinkRewriter<'a> {
    pub fn new(resolver: &'a PathResolver<'a>, site_map: &'a SiteMap) -> Self {
        LinkRewriter { resolver, site_map }
    }

    /// Both passes over Markdown: inline links, then `href` attributes.
    /// Code blocks and code spans are left as written.
    pub fn rewrite_links(&self, text: &str, current: &ContentFile) -> String {
        map_outside_code(text, |prose| {
            let markdown = self.rewrite_markdown_links(prose, current);
            self.rewrite_hrefs(&markdown, current)
        })
    }

    pub fn rewrite_markdown_links(&self, text: &str, current: &ContentFile) -> String {
        MARKDOWN_LINK
            .replace_all(text, |caps: &Captures| match self.resolve(current, &caps["target"]) {
                Some(href) => format!(
                    "[{}]({}{}{})",
                    &caps["text"],
                    href,
                    caps.name("anchor").map_or("", |m| m.as_str()),
                    caps.name("title").map_or("", |m| m.as_str()),
                ),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    pub fn rewrite_hrefs(&self, html: &str, current: &ContentFile) -> String {
        HREF.replace_all(html, |caps: &Captures| {
            let (target, anchor, quote) = match caps.name("dq") {
                Some(dq) => (dq.as_str(), caps.name("dqa"), '"'),
                None => (&caps["sq"], caps.name("sqa"), '\''),
            };
            match self.resolve(current, target) {
                Some(href) => format!(
                    "href={quote}{href}{}{quote}",
                    anchor.map_or("", |m| m.as_str())
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
    }

    /// Relative path to the page `target` becomes, if this build produces it.
    fn resolve(&self, current: &ContentFile, target: &str) -> Option<String> {
        if is_external(target) {
            return None;
        }
        let found = self.candidates(current, target).find_map(|c| self.site_map.get(&c));
        let Some(found) = found else {
            warn!(
                "Broken link in {}: '{}' is not a page of this site",
                current.rel.display(),
                target
            );
            return None;
        };
        let href = self.resolver.relative_path(&current.output, &found.output);
        debug!("Link rewrite: {} -> {} (via {})", target, href, current.rel.display());
        Some(href)
    }

    /// Source paths `target` may refer to: from the page's source directory,
    /// then from the directory it is emitted into (they differ for root pages).
    /// Paths leaving the content root are dropped.
    fn candidates(&self, current: &ContentFile, target: &str) -> impl Iterator<Item = PathBuf> {
        let candidates = match target.strip_prefix('/') {
            Some(absolute) => vec![normalize(Path::new(absolute))],
            None => {
                let source_dir = current.rel.parent().unwrap_or(Path::new(""));
                let output_dir = current.output.parent().unwrap_or(Path::new(""));
                let mut dirs = vec![normalize(&source_dir.join(target))];
                if source_dir != output_dir {
                    dirs.push(normalize(&output_dir.join(target)));
                }
                dirs
            }
        };
        candidates.into_iter().flatten()
    }
}

fn is_external(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("mailto:")
        || target.contains("://")
}
