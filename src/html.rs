use regex::{Captures, Regex};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
    sync::LazyLock,
};
use tracing::debug;

use crate::error::{BuildError, RenderError};

/// Key/value context handed to a template.
pub type Context = BTreeMap<String, String>;

pub const PAGE: &str = "page";
pub const HEADER: &str = "header";
pub const FOOTER: &str = "footer";
pub const ROBOTS: &str = "robots";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap());
static MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*)</main\s*>").unwrap());
static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Renders a template id with a context.
pub trait TemplateEngine {
    fn render(&self, id: &str, context: &Context) -> Result<String, RenderError>;
}

/// `{{ name }}` substitution over a fixed set of named templates.
/// Placeholders missing from the context render empty.
#[derive(Debug, Clone)]
pub struct Templates {
    templates: HashMap<String, String>,
}

const BUILTIN: [(&str, &str, &str); 4] = [
    (PAGE, "page.html", include_str!("../templates/page.html")),
    (HEADER, "header.html", include_str!("../templates/header.html")),
    (FOOTER, "footer.html", include_str!("../templates/footer.html")),
    (ROBOTS, "robots.txt", include_str!("../templates/robots.txt")),
];

impl Default for Templates {
    fn default() -> Self {
        Templates {
            templates: BUILTIN
                .iter()
                .map(|(id, _, body)| (id.to_string(), body.to_string()))
                .collect(),
        }
    }
}

impl Templates {
    /// Built-in templates, overridden by same-named files in `dir`.
    pub fn load(dir: Option<&Path>) -> Result<Templates, BuildError> {
        let mut templates = Templates::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };
        for (id, file_name, _) in BUILTIN {
            let path = dir.join(file_name);
            if path.is_file() {
                debug!("Using template override {}", path.display());
                let body = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
                templates.insert(id, body);
            }
        }
        Ok(templates)
    }

    pub fn insert(&mut self, id: &str, body: String) {
        self.templates.insert(id.to_string(), body);
    }
}

impl TemplateEngine for Templates {
    fn render(&self, id: &str, context: &Context) -> Result<String, RenderError> {
        let template = self
            .templates
            .get(id)
            .ok_or_else(|| RenderError::TemplateNotFound(id.to_string()))?;
        Ok(PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                context.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned())
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes the entities `escape_html` produces, plus numeric ones.
pub fn unescape_html(text: &str) -> String {
    static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"&(amp|lt|gt|quot|apos|nbsp|#[0-9]+|#[xX][0-9a-fA-F]+);").unwrap()
    });
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ => name[1..].parse().ok().and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Text content of an HTML fragment: tags dropped, entities decoded, whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let text = unescape_html(&TAG.replace_all(html, ""));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The page content of a pre-built document: `<main>` inner markup, else `<body>`, else everything.
pub fn extract_body(document: &str) -> &str {
    MAIN.captures(document)
        .or_else(|| BODY.captures(document))
        .and_then(|caps| caps.get(1))
        .map_or(document, |m| m.as_str())
}

pub fn extract_title(document: &str) -> Option<String> {
    TITLE
        .captures(document)
        .map(|caps| strip_tags(&caps[1]))
        .filter(|t| !t.is_empty())
}
