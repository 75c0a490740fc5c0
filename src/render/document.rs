//! Full HTML view of an analysis document

use super::markup::{escape_html, render_markup, split_pages};
use crate::models::{ChatRole, CourseAnalysis};
use crate::session::chat::{ChatEntry, Delivery};
use std::fmt::Write;

/// Everything shown on the result screen
pub struct DocumentView<'a> {
    pub analysis: &'a CourseAnalysis,
    /// Recorded answer per quiz question
    pub answers: &'a [Option<usize>],
    pub chat: &'a [ChatEntry],
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:56rem;margin:2rem auto;\
padding:0 1rem;color:#0f172a;line-height:1.6}section{margin:2.5rem 0}\
.page{border:1px solid #e2e8f0;border-radius:1rem;padding:1.5rem;margin:1rem 0}\
.page-number{color:#64748b;font-size:.8rem}.code-block{background:#0f172a;color:#38bdf8;\
padding:1rem;border-radius:.75rem;overflow-x:auto;white-space:pre}\
.correct{color:#15803d}.incorrect{color:#b91c1c}.failed{opacity:.6}\
.chat .user{text-align:right}.refs a{margin-right:1rem}";

pub fn render_document(view: &DocumentView<'_>) -> String {
    let analysis = view.analysis;
    let mut html = String::new();

    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body><h1>{title}</h1>",
        title = escape_html(&analysis.topic_title)
    );

    render_references(&mut html, analysis);
    render_mind_map(&mut html, analysis);
    render_pages(&mut html, analysis);
    render_timeline(&mut html, analysis);
    render_key_points(&mut html, analysis);
    render_examples(&mut html, analysis);
    render_quiz(&mut html, analysis, view.answers);
    render_chat(&mut html, view.chat);

    html.push_str("</body></html>");
    html
}

fn render_references(html: &mut String, analysis: &CourseAnalysis) {
    let urls = analysis.grounding_urls();
    if urls.is_empty() {
        return;
    }
    html.push_str("<section class=\"refs\"><h2>Grounded References</h2>");
    for url in urls {
        if is_web_link(&url.uri) {
            let _ = write!(
                html,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                escape_html(&url.uri),
                escape_html(&url.title)
            );
        } else {
            let _ = write!(
                html,
                "<span class=\"ref\">{} ({})</span>",
                escape_html(&url.title),
                escape_html(&url.uri)
            );
        }
    }
    html.push_str("</section>");
}

/// Only http(s) sources become clickable links
fn is_web_link(uri: &str) -> bool {
    let uri = uri.trim_start();
    ["http://", "https://"].iter().any(|scheme| {
        uri.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn render_mind_map(html: &mut String, analysis: &CourseAnalysis) {
    let Some(nodes) = analysis.mind_map.as_deref().filter(|n| !n.is_empty()) else {
        return;
    };
    html.push_str("<section class=\"mind-map\"><h2>Concept Map</h2><ul>");
    for node in nodes {
        let _ = write!(html, "<li><strong>{}</strong>", escape_html(&node.concept));
        if !node.details.is_empty() {
            html.push_str("<ul>");
            for detail in &node.details {
                let _ = write!(html, "<li>{}</li>", escape_html(detail));
            }
            html.push_str("</ul>");
        }
        html.push_str("</li>");
    }
    html.push_str("</ul></section>");
}

fn render_pages(html: &mut String, analysis: &CourseAnalysis) {
    let pages = split_pages(&analysis.summary);
    let total = pages.len();
    html.push_str("<section class=\"summary\">");
    for (i, page) in pages.iter().enumerate() {
        let _ = write!(
            html,
            "<article class=\"page\"><div class=\"page-number\">Page {} / {}</div>{}</article>",
            i + 1,
            total,
            render_markup(page)
        );
    }
    html.push_str("</section>");
}

fn render_timeline(html: &mut String, analysis: &CourseAnalysis) {
    let Some(items) = analysis.timeline.as_deref().filter(|t| !t.is_empty()) else {
        return;
    };
    html.push_str("<section class=\"timeline\"><h2>Timeline</h2><ol>");
    for item in items {
        let _ = write!(
            html,
            "<li><strong>{}</strong> {}<p>{}</p></li>",
            escape_html(&item.date),
            escape_html(&item.event),
            escape_html(&item.description)
        );
    }
    html.push_str("</ol></section>");
}

fn render_key_points(html: &mut String, analysis: &CourseAnalysis) {
    if analysis.key_points.is_empty() {
        return;
    }
    html.push_str("<section class=\"key-points\"><h2>Key Points</h2><ul>");
    for point in &analysis.key_points {
        let _ = write!(html, "<li>{}</li>", escape_html(point));
    }
    html.push_str("</ul></section>");
}

fn render_examples(html: &mut String, analysis: &CourseAnalysis) {
    if analysis.examples.is_empty() {
        return;
    }
    html.push_str("<section class=\"examples\"><h2>Study Cases</h2>");
    for example in &analysis.examples {
        let _ = write!(
            html,
            "<div class=\"example\"><h3>{}</h3><p>{}</p><p><em>{}</em></p></div>",
            escape_html(&example.title),
            escape_html(&example.description),
            escape_html(&example.analogy)
        );
    }
    html.push_str("</section>");
}

fn render_quiz(html: &mut String, analysis: &CourseAnalysis, answers: &[Option<usize>]) {
    if analysis.quiz.is_empty() {
        return;
    }
    html.push_str("<section class=\"quiz\"><h2>Quiz</h2>");
    for (i, question) in analysis.quiz.iter().enumerate() {
        let answer = answers.get(i).copied().flatten();
        let _ = write!(
            html,
            "<div class=\"question\" data-index=\"{}\"><p><strong>{}.</strong> {}</p><ol type=\"A\">",
            i,
            i + 1,
            escape_html(&question.question)
        );

        for (j, option) in question.options.iter().enumerate() {
            let class = match answer {
                Some(_) if j == question.correct_index => " class=\"correct\"",
                Some(selected) if j == selected => " class=\"incorrect\"",
                _ => "",
            };
            let _ = write!(html, "<li{}>{}</li>", class, escape_html(option));
        }
        html.push_str("</ol>");

        if answer.is_some() {
            let _ = write!(
                html,
                "<p class=\"explanation\">{}</p>",
                escape_html(&question.explanation)
            );
        }
        html.push_str("</div>");
    }
    html.push_str("</section>");
}

fn render_chat(html: &mut String, chat: &[ChatEntry]) {
    if chat.is_empty() {
        return;
    }
    html.push_str("<section class=\"chat\"><h2>Questions</h2>");
    for entry in chat {
        let role = match entry.message.role {
            ChatRole::User => "user",
            ChatRole::Bot => "bot",
        };
        let state = match entry.delivery {
            Delivery::Pending => " pending",
            Delivery::Confirmed => "",
            Delivery::Failed => " failed",
        };
        let _ = write!(
            html,
            "<p class=\"{}{}\">{}</p>",
            role,
            state,
            escape_html(&entry.message.text)
        );
    }
    html.push_str("</section>");
}
