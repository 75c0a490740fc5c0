//! Lightweight summary markup to HTML
//!
//! The model writes summaries with `## ` / `### ` headings, `**bold**`,
//! inline backticks and fenced code blocks, split into pages by
//! [`PAGE_MARKER`]. Fenced blocks are pulled out before any other rule runs
//! and put back last, so their contents come out verbatim (escaped only).

use regex::Regex;
use std::sync::OnceLock;

/// Separator between summary pages
pub const PAGE_MARKER: &str = "---PAGE---";

/// Placeholder delimiter; a private-use character no rule matches
const SLOT: char = '\u{E000}';

struct Rules {
    fence: Regex,
    h3: Regex,
    h2: Regex,
    inline_code: Regex,
    bold: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            fence: Regex::new(r"(?s)```(.*?)```")?,
            h3: Regex::new(r"(?m)^### (.*)$")?,
            h2: Regex::new(r"(?m)^## (.*)$")?,
            inline_code: Regex::new(r"`([^`\n]*)`")?,
            bold: Regex::new(r"\*\*(.*?)\*\*")?,
        })
    }
}

static RULES: OnceLock<Result<Rules, regex::Error>> = OnceLock::new();

fn rules() -> Option<&'static Rules> {
    RULES.get_or_init(Rules::compile).as_ref().ok()
}

/// Split a summary into pages, one per marker-delimited section.
///
/// Blank sections are kept so page numbering follows the marker count.
pub fn split_pages(summary: &str) -> Vec<&str> {
    summary.split(PAGE_MARKER).map(str::trim).collect()
}

/// Escape text for HTML element and attribute content
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

/// Drop a leading language tag line such as `rust` or `c++`
fn strip_language_tag(code: &str) -> &str {
    match code.split_once('\n') {
        Some((first, rest))
            if !first.is_empty()
                && first
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#')) =>
        {
            rest
        }
        _ => code,
    }
}

/// Render one page of summary markup to an HTML fragment
pub fn render_markup(text: &str) -> String {
    // Some responses carry escaped newlines
    let text = text.replace("\\n", "\n");

    let Some(rules) = rules() else {
        return escape_html(&text).replace('\n', "<br/>");
    };

    let mut blocks = Vec::new();
    let text = rules.fence.replace_all(&text, |caps: &regex::Captures| {
        let code = strip_language_tag(caps[1].trim_start_matches([' ', '\t'])).trim();
        blocks.push(format!(
            "<pre class=\"code-block\"><code>{}</code></pre>",
            escape_html(code)
        ));
        format!("{SLOT}{}{SLOT}", blocks.len() - 1)
    });

    let html = escape_html(&text);
    let html = rules.h3.replace_all(&html, "<h3>$1</h3>");
    let html = rules.h2.replace_all(&html, "<h2>$1</h2>");
    let html = rules.inline_code.replace_all(&html, "<code>$1</code>");
    let html = rules.bold.replace_all(&html, "<strong>$1</strong>");
    let mut html = html.replace('\n', "<br/>");

    for (i, block) in blocks.iter().enumerate() {
        html = html.replace(&format!("{SLOT}{i}{SLOT}"), block);
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_pages() {
        assert_eq!(split_pages("A---PAGE---B"), vec!["A", "B"]);
    }

    #[test]
    fn test_split_without_marker_is_one_page() {
        assert_eq!(split_pages("Just one page"), vec!["Just one page"]);
        assert_eq!(split_pages(""), vec![""]);
    }

    #[test]
    fn test_split_keeps_blank_pages() {
        assert_eq!(split_pages("A---PAGE---"), vec!["A", ""]);
        assert_eq!(
            split_pages("\nA\n---PAGE---\n---PAGE---B"),
            vec!["A", "", "B"]
        );
    }

    #[test]
    fn test_headings_bold_and_inline_code() {
        let html = render_markup("## Title\n### Sub\nUse **care** with `x < y`");
        assert_eq!(
            html,
            "<h2>Title</h2><br/><h3>Sub</h3><br/>Use <strong>care</strong> with <code>x &lt; y</code>"
        );
    }

    #[test]
    fn test_code_block_contents_are_verbatim() {
        let html = render_markup("Before\n```\n### not a heading\n**not bold**\n```\nAfter");
        assert!(html.contains("### not a heading\n**not bold**"));
        assert!(!html.contains("<h3>not a heading</h3>"));
        assert!(!html.contains("<strong>not bold</strong>"));
        assert!(html.starts_with("Before<br/><pre class=\"code-block\"><code>"));
        assert!(html.ends_with("</code></pre><br/>After"));
    }

    #[test]
    fn test_code_block_language_tag_dropped() {
        let html = render_markup("```rust\nfn main() {}\n```");
        assert_eq!(
            html,
            "<pre class=\"code-block\"><code>fn main() {}</code></pre>"
        );
    }

    #[test]
    fn test_html_is_escaped() {
        let html = render_markup("<script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));

        let html = render_markup("```\n<b>tag</b>\n```");
        assert!(html.contains("&lt;b&gt;tag&lt;/b&gt;"));
    }

    #[test]
    fn test_escaped_newlines_become_breaks() {
        assert_eq!(render_markup("a\\nb"), "a<br/>b");
    }
}
