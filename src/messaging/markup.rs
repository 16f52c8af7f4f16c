//! Lightweight markdown to chat-safe HTML
//!
//! Chat transports accept a small HTML subset (`b`, `i`, `s`, `code`, `pre`,
//! `a`). Raw HTML in the input is stripped, everything else is escaped, and
//! links survive only for whitelisted schemes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Link schemes allowed to become anchors
const SAFE_SCHEMES: [&str; 4] = ["http://", "https://", "mailto:", "tg://"];

/// Placeholder delimiter; never valid in chat text
const SLOT: char = '\u{1}';

static FENCED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\n?(.*?)```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
/// URLs may carry one level of balanced parentheses
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\(((?:[^()\s]|\([^()\s]*\))+)\)").unwrap()
});
/// Tag-shaped runs only: every attribute must be `name=value`
static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"</?[A-Za-z][A-Za-z0-9]*(?:\s+[A-Za-z_:][-A-Za-z0-9_:.]*\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))*\s*/?>|<!--.*?-->"#,
    )
    .unwrap()
});
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+(.+?)[ \t#]*$").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^([ \t]*)[-*+][ \t]+").unwrap());
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^\n]+?)\*\*").unwrap());
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^\n]+?)__").unwrap());
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^\n]+?)~~").unwrap());
static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b_([^_\n]+)_\b").unwrap());
static SLOT_REF: Lazy<Regex> = Lazy::new(|| Regex::new("\u{1}(\\d+)\u{1}").unwrap());

/// Convert markdown to the chat HTML subset
pub fn markdown_to_html(markdown: &str) -> String {
    let mut slots: Vec<String> = Vec::new();
    let text = markdown.replace(SLOT, "");

    let text = FENCED_CODE.replace_all(&text, |caps: &Captures| {
        let body = escape_html(caps[1].trim_end_matches('\n'));
        stash(&mut slots, format!("<pre><code>{body}</code></pre>"))
    });

    let text = INLINE_CODE.replace_all(&text, |caps: &Captures| {
        stash(&mut slots, format!("<code>{}</code>", escape_html(&caps[1])))
    });

    let text = HTML_TAG.replace_all(&text, "");

    let text = LINK.replace_all(&text, |caps: &Captures| {
        let label = format_inline(&escape_html(&caps[1]));
        let url = &caps[2];
        let html = if is_safe_url(url) {
            format!("<a href=\"{}\">{}</a>", escape_attribute(url), label)
        } else {
            label
        };
        stash(&mut slots, html)
    });

    let text = escape_html(&text);
    let text = HEADING.replace_all(&text, "<b>$1</b>");
    let text = BULLET.replace_all(&text, "$1• ");
    let text = format_inline(&text);

    SLOT_REF
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| slots.get(idx).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Remove every HTML tag and escape the remainder, without any formatting
pub fn strip_to_plain_text(text: &str) -> String {
    escape_html(&HTML_TAG.replace_all(text, ""))
}

fn stash(slots: &mut Vec<String>, html: String) -> String {
    slots.push(html);
    format!("{SLOT}{}{SLOT}", slots.len() - 1)
}

fn format_inline(text: &str) -> String {
    let text = BOLD_STARS.replace_all(text, "<b>$1</b>");
    let text = BOLD_UNDERSCORES.replace_all(&text, "<b>$1</b>");
    let text = STRIKE.replace_all(&text, "<s>$1</s>");
    let text = ITALIC_STAR.replace_all(&text, "<i>$1</i>");
    ITALIC_UNDERSCORE
        .replace_all(&text, "<i>$1</i>")
        .into_owned()
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    SAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}
