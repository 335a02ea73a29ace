use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;
use std::{collections::HashSet, sync::LazyLock};

use crate::error::RenderError;
use crate::html::escape_html;

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Cc}\p{Cf}&&[^\n\t\r]]").unwrap());
static TRAILING_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A```json\s*(\{.*\})\s*```\s*\z").unwrap());
/// `` `code` `` and ``` ``code`` ``` spans on a single line.
static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"``[^\n]*?``|`[^`\n]+`").unwrap());

/// Converts Markdown to an HTML fragment.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

/// pulldown-cmark renderer that gives headings ids and keeps mermaid diagrams.
#[derive(Debug, Clone)]
pub struct CmarkRenderer {
    heading_ids: bool,
}

impl CmarkRenderer {
    pub fn new(heading_ids: bool) -> Self {
        CmarkRenderer { heading_ids }
    }
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        CmarkRenderer::new(true)
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let parser = Parser::new_ext(markdown, options);
        let events = process_markdown_events(parser, self.heading_ids);
        Ok(events_to_html(events))
    }
}

struct PendingHeading<'a> {
    level: HeadingLevel,
    id: Option<&'a str>,
    classes: Vec<&'a str>,
    events: Vec<Event<'a>>,
}

fn process_markdown_events<'a>(parser: Parser<'a, 'a>, heading_ids: bool) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    let mut heading: Option<PendingHeading<'a>> = None;
    let mut mermaid: Option<String> = None;
    let mut used_ids = HashSet::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading(level, id, classes)) => {
                heading = Some(PendingHeading {
                    level,
                    id,
                    classes,
                    events: Vec::new(),
                });
            }
            Event::End(Tag::Heading(..)) => {
                if let Some(pending) = heading.take() {
                    let text = plain_text(&pending.events);
                    let id = match pending.id {
                        Some(explicit) => Some(unique_id(explicit.to_string(), &mut used_ids)),
                        None if heading_ids => Some(slugify(&text))
                            .filter(|s| !s.is_empty())
                            .map(|s| unique_id(s, &mut used_ids)),
                        None => None,
                    };
                    let n = heading_level_to_num(pending.level);
                    let mut open = format!("<h{n}");
                    if let Some(id) = id {
                        open.push_str(&format!(" id=\"{}\"", escape_html(&id)));
                    }
                    if !pending.classes.is_empty() {
                        let classes = escape_html(&pending.classes.join(" "));
                        open.push_str(&format!(" class=\"{classes}\""));
                    }
                    open.push('>');
                    events.push(Event::Html(open.into()));
                    events.extend(pending.events);
                    events.push(Event::Html(format!("</h{n}>\n").into()));
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref lang)))
                if lang.split_whitespace().next() == Some("mermaid") =>
            {
                mermaid = Some(String::new());
            }
            Event::Text(ref text) if mermaid.is_some() => {
                if let Some(code) = mermaid.as_mut() {
                    code.push_str(text);
                }
            }
            Event::End(Tag::CodeBlock(_)) if mermaid.is_some() => {
                let code = mermaid.take().unwrap_or_default();
                let code = escape_html(code.trim_end());
                events.push(Event::Html(
                    format!("<div class=\"mermaid\">\n{code}\n</div>\n").into(),
                ));
            }
            e => match heading.as_mut() {
                Some(pending) => pending.events.push(e),
                None => events.push(e),
            },
        }
    }
    events
}

fn events_to_html(events: Vec<Event>) -> String {
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, events.into_iter());
    html_output
}

fn plain_text(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
            _ => None,
        })
        .collect()
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// `Install npm & Node!` -> `install-npm-node`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Strips control characters and carriage returns that break heading detection.
pub fn normalize_markdown(content: &str) -> String {
    CONTROL_CHARS
        .replace_all(content, "")
        .replace('\r', "")
        .replace('\u{00A0}', " ")
}

/// Splits a trailing ```` ```json {…} ``` ```` metadata block off the body.
/// Only the last `json` fence is considered, and only when nothing follows it.
pub fn split_json_metadata(content: &str) -> (String, Option<String>) {
    let Some(start) = content.rfind("```json") else {
        return (content.to_string(), None);
    };
    let json = TRAILING_JSON
        .captures(&content[start..])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|json| !json.contains("```"));
    match json {
        Some(json) => (content[..start].trim_end().to_string() + "\n", Some(json.to_string())),
        None => (content.to_string(), None),
    }
}

/// Applies `f` to the text outside fenced code blocks. Fences, including an
/// unclosed one running to the end, are copied verbatim.
pub fn map_outside_fences(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prose = String::new();
    let mut fence: Option<(char, usize)> = None;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker.map_or(0, |m| trimmed.chars().take_while(|c| *c == m).count());
        match fence {
            None if run >= 3 => {
                out.push_str(&f(&prose));
                prose.clear();
                fence = marker.map(|m| (m, run));
                out.push_str(line);
            }
            None => prose.push_str(line),
            Some((open, len)) => {
                out.push_str(line);
                let closes = marker == Some(open) && run >= len && trimmed[run..].trim().is_empty();
                if closes {
                    fence = None;
                }
            }
        }
    }
    out.push_str(&f(&prose));
    out
}

/// Like [`map_outside_fences`], also leaving inline code spans untouched.
pub fn map_outside_code(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    map_outside_fences(text, |prose| {
        let mut out = String::with_capacity(prose.len());
        let mut last = 0;
        for span in CODE_SPAN.find_iter(prose) {
            out.push_str(&f(&prose[last..span.start()]));
            out.push_str(span.as_str());
            last = span.end();
        }
        out.push_str(&f(&prose[last..]));
        out
    })
}

/// Removes the indentation shared by every non-blank line.
pub fn dedent(content: &str) -> String {
    let indent = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    content
        .lines()
        .map(|l| if l.trim().is_empty() { "" } else { l.get(indent..).unwrap_or(l.trim_start()) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// YAML page bodies are rendered only when they contain Markdown-like punctuation.
pub fn looks_like_markdown(content: &str) -> bool {
    content.contains('#') || content.contains('*') || content.contains('[')
}
