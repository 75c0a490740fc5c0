//! Analysis client: the four operations the session layer calls
//!
//! Every response is narrowed at this boundary into the domain types. Shape
//! mismatches become `DetectionError`/`QuizError`, or the degraded analysis
//! path, never a panic further downstream.

use super::{prompts, schema, ModelBackend, ModelError, ModelRequest};
use crate::config::{Limits, ModelConfig};
use crate::models::{
    AnalysisMode, AnalysisStyle, Chapter, CourseAnalysis, MindMapNode, PracticalExample,
    QuizQuestion, TimelineItem,
};
use crate::util::truncate_chars;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Key point attached to web-grounded analyses
pub const GROUNDED_NOTE: &str = "Detailed analysis generated with web search grounding.";

/// Answer used when the model returns no text for a chat question
pub const EMPTY_ANSWER: &str = "I'm sorry, I couldn't produce an answer for that.";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Chapter detection failed
#[derive(Debug)]
pub enum DetectionError {
    Model(ModelError),
    /// The model answered but not with a usable chapter list
    Malformed(String),
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "Chapter detection failed: {}", e),
            Self::Malformed(msg) => write!(f, "Chapter detection returned malformed data: {}", msg),
        }
    }
}

impl std::error::Error for DetectionError {}

/// Analysis failed outright (schema mismatches degrade instead)
#[derive(Debug)]
pub enum AnalysisError {
    Model(ModelError),
    /// The model returned no text at all
    EmptyResponse,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "Analysis failed: {}", e),
            Self::EmptyResponse => write!(f, "Analysis failed: the model returned no content"),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Extra question generation failed
#[derive(Debug)]
pub enum QuizError {
    Model(ModelError),
    Malformed(String),
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "Question generation failed: {}", e),
            Self::Malformed(msg) => write!(f, "Question generation returned malformed data: {}", msg),
        }
    }
}

impl std::error::Error for QuizError {}

/// Follow-up question failed
#[derive(Debug)]
pub struct ChatError(pub ModelError);

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Question answering failed: {}", self.0)
    }
}

impl std::error::Error for ChatError {}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a study-guide request
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: CourseAnalysis,
    pub mode: AnalysisMode,
}

#[derive(Clone)]
pub struct AnalysisClient {
    backend: Arc<dyn ModelBackend>,
    fast_model: String,
    deep_model: String,
    limits: Limits,
}

impl AnalysisClient {
    pub fn new(backend: Arc<dyn ModelBackend>, model: &ModelConfig, limits: Limits) -> Self {
        Self {
            backend,
            fast_model: model.fast_model.clone(),
            deep_model: model.deep_model.clone(),
            limits,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    /// Segment the input into chapters, all marked unstudied
    pub async fn detect_chapters(&self, text: &str, language: &str) -> Result<Vec<Chapter>, DetectionError> {
        let source = truncate_chars(text, self.limits.detect_chars);
        let request = ModelRequest::structured(
            &self.fast_model,
            prompts::detect_chapters(source, language),
            schema::chapters(),
        );

        let reply = self
            .backend
            .generate(request)
            .await
            .map_err(DetectionError::Model)?;
        let raw = reply
            .text
            .ok_or_else(|| DetectionError::Malformed("empty response".to_string()))?;

        let wire: Vec<WireChapter> = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| DetectionError::Malformed(e.to_string()))?;

        let chapters = narrow_chapters(wire);
        if chapters.is_empty() {
            return Err(DetectionError::Malformed("no chapters detected".to_string()));
        }

        tracing::info!(chapters = chapters.len(), "Detected chapters");
        Ok(chapters)
    }

    /// Build the study guide for one chapter
    pub async fn analyze_course_content(
        &self,
        text: &str,
        style: AnalysisStyle,
        chapter_title: &str,
        language: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let source = truncate_chars(text, self.limits.analyze_chars);
        let prompt = prompts::analyze_chapter(source, chapter_title, style, language);

        let request = if style.uses_web_search() {
            ModelRequest {
                web_search: true,
                ..ModelRequest::text(&self.deep_model, prompt)
            }
        } else {
            ModelRequest::structured(&self.deep_model, prompt, schema::course_analysis())
        };

        let reply = self
            .backend
            .generate(request)
            .await
            .map_err(AnalysisError::Model)?;
        let raw = reply.text.ok_or(AnalysisError::EmptyResponse)?;
        let citations = reply.citations;

        if style.uses_web_search() {
            let mut analysis = CourseAnalysis::raw_text(chapter_title, raw);
            analysis.key_points = vec![GROUNDED_NOTE.to_string()];
            analysis.grounding_urls = Some(citations);
            return Ok(AnalysisOutcome {
                analysis,
                mode: AnalysisMode::Grounded,
            });
        }

        match serde_json::from_str::<WireAnalysis>(strip_code_fence(&raw)) {
            Ok(wire) => {
                let mut analysis = wire.narrow(chapter_title);
                analysis.grounding_urls = Some(citations);
                Ok(AnalysisOutcome {
                    analysis,
                    mode: AnalysisMode::Structured,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Analysis did not match schema, showing raw text");
                let mut analysis = CourseAnalysis::raw_text(chapter_title, raw);
                analysis.grounding_urls = Some(citations);
                Ok(AnalysisOutcome {
                    analysis,
                    mode: AnalysisMode::Degraded,
                })
            }
        }
    }

    /// Ask for another batch of questions about `context`
    pub async fn generate_more_questions(
        &self,
        context: &str,
        current_count: usize,
        language: &str,
    ) -> Result<Vec<QuizQuestion>, QuizError> {
        let source = truncate_chars(context, self.limits.quiz_chars);
        let request = ModelRequest::structured(
            &self.fast_model,
            prompts::more_questions(source, current_count, language),
            schema::quiz_questions(),
        );

        let reply = self
            .backend
            .generate(request)
            .await
            .map_err(QuizError::Model)?;
        let Some(raw) = reply.text else {
            return Ok(Vec::new());
        };

        let wire: Vec<WireQuestion> = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| QuizError::Malformed(e.to_string()))?;

        Ok(narrow_questions(wire))
    }

    /// Answer a free-form question against the source text
    pub async fn ask_document_question(
        &self,
        context: &str,
        question: &str,
        language: &str,
    ) -> Result<String, ChatError> {
        let source = truncate_chars(context, self.limits.chat_chars);
        let request = ModelRequest::text(
            &self.fast_model,
            prompts::document_question(source, question, language),
        );

        let reply = self.backend.generate(request).await.map_err(ChatError)?;
        Ok(reply.text.unwrap_or_else(|| EMPTY_ANSWER.to_string()))
    }
}

/// Remove a surrounding ```json fence some models add around JSON output
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types and narrowing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireChapter {
    #[serde(default)]
    id: Option<serde_json::Value>,
    title: String,
    #[serde(default)]
    content: String,
}

/// Ids must be non-empty and unique; offenders are renumbered by position
fn narrow_chapters(wire: Vec<WireChapter>) -> Vec<Chapter> {
    let mut seen = HashSet::new();

    wire.into_iter()
        .enumerate()
        .map(|(index, chapter)| {
            let id = match chapter.id {
                Some(serde_json::Value::String(s)) => s.trim().to_string(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let id = if id.is_empty() || seen.contains(&id) {
                let mut n = index + 1;
                while seen.contains(&format!("chapter-{}", n)) {
                    n += 1;
                }
                format!("chapter-{}", n)
            } else {
                id
            };
            seen.insert(id.clone());

            Chapter {
                id,
                title: chapter.title,
                content: chapter.content,
                studied: false,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    correct_index: i64,
    #[serde(default)]
    explanation: String,
}

fn narrow_questions(wire: Vec<WireQuestion>) -> Vec<QuizQuestion> {
    let total = wire.len();
    let questions: Vec<QuizQuestion> = wire
        .into_iter()
        .filter_map(|q| {
            let correct_index = usize::try_from(q.correct_index).ok()?;
            let question = QuizQuestion {
                question: q.question,
                options: q.options,
                correct_index,
                explanation: q.explanation,
            };
            question.is_well_formed().then_some(question)
        })
        .collect();

    if questions.len() < total {
        tracing::warn!(
            dropped = total - questions.len(),
            "Dropped quiz questions with invalid options or answer index"
        );
    }
    questions
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExample {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    analogy: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimelineItem {
    #[serde(default)]
    date: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAnalysis {
    topic_title: String,
    summary: String,
    key_points: Vec<String>,
    examples: Vec<WireExample>,
    quiz: Vec<WireQuestion>,
    #[serde(default)]
    timeline: Option<Vec<WireTimelineItem>>,
    #[serde(default)]
    mind_map: Option<Vec<MindMapNode>>,
}

impl WireAnalysis {
    fn narrow(self, chapter_title: &str) -> CourseAnalysis {
        let topic_title = if self.topic_title.trim().is_empty() {
            chapter_title.to_string()
        } else {
            self.topic_title
        };

        CourseAnalysis {
            topic_title,
            summary: self.summary,
            key_points: self.key_points,
            examples: self
                .examples
                .into_iter()
                .map(|e| PracticalExample {
                    title: e.title,
                    description: e.description,
                    analogy: e.analogy,
                })
                .collect(),
            quiz: narrow_questions(self.quiz),
            timeline: self.timeline.map(|items| {
                items
                    .into_iter()
                    .map(|t| TimelineItem {
                        date: t.date,
                        event: t.event,
                        description: t.description,
                    })
                    .collect()
            }),
            mind_map: self.mind_map,
            grounding_urls: None,
        }
    }
}
