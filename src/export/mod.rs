//! PDF export of an analysis document
//!
//! The document is flattened to plain text (markup removed), word-wrapped to
//! the page width and paginated. Every summary page starts a new PDF page.

pub mod pdf;

use crate::models::CourseAnalysis;
use crate::render::markup::split_pages;
use crate::util::file_stem;
use std::fmt;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug)]
pub enum ExportError {
    Pdf(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf(msg) => write!(f, "PDF generation failed: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

/// Download name for an exported document
pub fn pdf_filename(topic_title: &str) -> String {
    format!("{}.pdf", file_stem(topic_title))
}

/// Render an analysis to PDF bytes
pub fn export_pdf(analysis: &CourseAnalysis) -> Result<Vec<u8>, ExportError> {
    let sections = layout(analysis);
    let pages = paginate(&sections, pdf::CHARS_PER_LINE, pdf::LINES_PER_PAGE);
    pdf::write_pages(&pages)
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Strip summary markup to plain text. Fenced code keeps its markup.
fn plain_text(markup: &str) -> String {
    let markup = markup.replace("\\n", "\n");
    let mut in_fence = false;
    let mut lines = Vec::new();

    for line in markup.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(line.to_string());
            continue;
        }

        let line = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
            .unwrap_or(line);
        lines.push(line.replace("**", "").replace('`', ""));
    }
    lines.join("\n")
}

/// Sections of unwrapped paragraphs; each section starts on a new page
fn layout(analysis: &CourseAnalysis) -> Vec<Vec<String>> {
    let mut sections = Vec::new();
    let pages = split_pages(&analysis.summary);
    let total = pages.len();

    for (i, page) in pages.iter().enumerate() {
        let mut section = Vec::new();
        if i == 0 {
            section.push(analysis.topic_title.to_uppercase());
            section.push(String::new());
        }
        section.push(format!("Page {} / {}", i + 1, total));
        section.push(String::new());
        section.extend(plain_text(page).lines().map(str::to_string));
        sections.push(section);
    }

    let mut extras = Vec::new();

    if !analysis.key_points.is_empty() {
        extras.push("KEY POINTS".to_string());
        extras.extend(analysis.key_points.iter().map(|p| format!("\u{2022} {}", p)));
        extras.push(String::new());
    }

    if !analysis.examples.is_empty() {
        extras.push("STUDY CASES".to_string());
        for example in &analysis.examples {
            extras.push(example.title.clone());
            extras.push(example.description.clone());
            extras.push(format!("Analogy: {}", example.analogy));
            extras.push(String::new());
        }
    }

    if let Some(items) = analysis.timeline.as_deref().filter(|t| !t.is_empty()) {
        extras.push("TIMELINE".to_string());
        for item in items {
            extras.push(format!("{}: {} - {}", item.date, item.event, item.description));
        }
        extras.push(String::new());
    }

    if let Some(nodes) = analysis.mind_map.as_deref().filter(|n| !n.is_empty()) {
        extras.push("CONCEPT MAP".to_string());
        for node in nodes {
            extras.push(format!("\u{2022} {}", node.concept));
            extras.extend(node.details.iter().map(|d| format!("    - {}", d)));
        }
        extras.push(String::new());
    }

    if !analysis.quiz.is_empty() {
        extras.push("QUIZ".to_string());
        for (i, question) in analysis.quiz.iter().enumerate() {
            extras.push(format!("{}. {}", i + 1, question.question));
            for (j, option) in question.options.iter().enumerate() {
                extras.push(format!("   {}) {}", option_letter(j), option));
            }
            extras.push(format!(
                "   Answer: {}. {}",
                option_letter(question.correct_index),
                question.explanation
            ));
            extras.push(String::new());
        }
    }

    let urls = analysis.grounding_urls();
    if !urls.is_empty() {
        extras.push("REFERENCES".to_string());
        extras.extend(urls.iter().map(|u| format!("{} <{}>", u.title, u.uri)));
    }

    if !extras.is_empty() {
        sections.push(extras);
    }
    sections
}

fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
        .unwrap_or('?')
}

/// Word-wrap one paragraph to `width` display columns
fn wrap(paragraph: &str, width: usize) -> Vec<String> {
    if paragraph.trim().is_empty() {
        return vec![String::new()];
    }

    let indent: String = paragraph.chars().take_while(|c| *c == ' ').collect();
    let mut lines = Vec::new();
    let mut current = indent.clone();

    for word in paragraph.split_whitespace() {
        let needed = if current.trim().is_empty() {
            word.width()
        } else {
            word.width() + 1
        };

        if current.width() + needed > width && !current.trim().is_empty() {
            lines.push(std::mem::replace(&mut current, indent.clone()));
        }

        if indent.width() + word.width() > width {
            // hard-split words that cannot fit on any line
            for c in word.chars() {
                if current.width() + c.width().unwrap_or(0) > width {
                    lines.push(std::mem::replace(&mut current, indent.clone()));
                }
                current.push(c);
            }
            continue;
        }

        if !current.trim().is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap every section and cut it into pages of `height` lines
fn paginate(sections: &[Vec<String>], width: usize, height: usize) -> Vec<Vec<String>> {
    let mut pages = Vec::new();

    for section in sections {
        let lines: Vec<String> = section.iter().flat_map(|p| wrap(p, width)).collect();
        for chunk in lines.chunks(height.max(1)) {
            pages.push(chunk.to_vec());
        }
    }

    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}
