//! Session state machine
//!
//! ```text
//!            detect             ok
//!   IDLE ──────────► PARSING ───────► CONFIGURING ◄──────────┐
//!    ▲                  │ err          │  ▲   analyze         │ err / back
//!    │                  ▼              │  └──────── LOADING ──┤
//!    │                ERROR            │ back           │ ok  │
//!    └─────────────────────────────────┘                ▼     │
//!                  reset (from any state)             SUCCESS ─┘
//! ```
//!
//! Remote work is split into `begin_*` (validates the source state, moves to
//! the in-flight state and hands out a job carrying an epoch ticket) and
//! `finish_*` (applies the result only if the ticket still matches). Reset,
//! back and every new request bump the epoch, so a result that resolves
//! after the user moved on is dropped.
//!
//! Actions attempted from the wrong state return `SessionError` and leave
//! the session untouched.

pub mod chat;
pub mod driver;
pub mod quiz;
pub mod store;

use crate::llm::client::AnalysisOutcome;
use crate::models::{
    AnalysisMode, AnalysisStyle, Chapter, CourseAnalysis, QuizQuestion, UserProfile,
};
use chat::{ChatEntry, Transcript};
use quiz::{AnswerState, QuizBoard};
use serde::Serialize;
use std::fmt;

pub use driver::SessionDriver;
pub use store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Idle,
    Parsing,
    Configuring,
    Loading,
    Success,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Parsing => "PARSING",
            Self::Configuring => "CONFIGURING",
            Self::Loading => "LOADING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Action not allowed from the current status
    InvalidState { action: &'static str, status: Status },
    /// A request of the same kind is already in flight
    Busy(&'static str),
    EmptyInput,
    EmptyQuestion,
    EmptyLanguage,
    UnknownChapter(String),
    NoChapterSelected,
    QuestionOutOfRange(usize),
    OptionOutOfRange { question: usize, option: usize },
}

impl SessionError {
    /// Errors caused by timing rather than bad input
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::Busy(_))
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { action, status } => {
                write!(f, "Cannot {} while the session is {}", action, status)
            }
            Self::Busy(what) => write!(f, "A {} request is already in progress", what),
            Self::EmptyInput => write!(f, "Input text is empty"),
            Self::EmptyQuestion => write!(f, "Question is empty"),
            Self::EmptyLanguage => write!(f, "Language must not be empty"),
            Self::UnknownChapter(id) => write!(f, "Unknown chapter: {}", id),
            Self::NoChapterSelected => write!(f, "No chapter selected"),
            Self::QuestionOutOfRange(index) => write!(f, "No quiz question at index {}", index),
            Self::OptionOutOfRange { question, option } => {
                write!(f, "Question {} has no option {}", question, option)
            }
        }
    }
}

impl std::error::Error for SessionError {}

// ─────────────────────────────────────────────────────────────────────────────
// Jobs
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies the session generation a request was started in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct DetectionJob {
    pub ticket: Ticket,
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub ticket: Ticket,
    pub text: String,
    pub chapter_id: String,
    pub chapter_title: String,
    pub style: AnalysisStyle,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct QuizJob {
    pub ticket: Ticket,
    pub context: String,
    pub current_count: usize,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct ChatJob {
    pub ticket: Ticket,
    pub message_id: String,
    pub context: String,
    pub question: String,
    pub language: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    status: Status,
    input: String,
    language: String,
    chapters: Vec<Chapter>,
    selected_chapter_id: Option<String>,
    style: AnalysisStyle,
    analysis: Option<CourseAnalysis>,
    analysis_mode: Option<AnalysisMode>,
    quiz: QuizBoard,
    chat: Transcript,
    error: Option<String>,
    user: Option<UserProfile>,
    /// Drive access token from this session's picker; never serialized
    drive_token: Option<String>,
    epoch: u64,
}

/// Serializable view returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub status: Status,
    pub input: String,
    pub language: String,
    pub chapters: Vec<Chapter>,
    pub selected_chapter_id: Option<String>,
    pub style: AnalysisStyle,
    pub analysis: Option<CourseAnalysis>,
    pub analysis_mode: Option<AnalysisMode>,
    pub quiz_answers: Vec<Option<usize>>,
    pub quiz_loading_more: bool,
    pub chat: Vec<ChatEntry>,
    pub chat_pending: bool,
    pub chat_error: Option<String>,
    pub error: Option<String>,
    pub user: Option<UserProfile>,
    pub drive_authorized: bool,
}

impl Session {
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Status::Idle,
            input: String::new(),
            language: language.into(),
            chapters: Vec::new(),
            selected_chapter_id: None,
            style: AnalysisStyle::default(),
            analysis: None,
            analysis_mode: None,
            quiz: QuizBoard::default(),
            chat: Transcript::default(),
            error: None,
            user: None,
            drive_token: None,
            epoch: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn selected_chapter(&self) -> Option<&Chapter> {
        let id = self.selected_chapter_id.as_deref()?;
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn quiz(&self) -> &QuizBoard {
        &self.quiz
    }

    pub fn chat(&self) -> &Transcript {
        &self.chat
    }

    /// The current analysis with every quiz question appended so far
    pub fn document(&self) -> Option<CourseAnalysis> {
        let mut analysis = self.analysis.clone()?;
        analysis.quiz = self.quiz.questions().to_vec();
        Some(analysis)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            status: self.status,
            input: self.input.clone(),
            language: self.language.clone(),
            chapters: self.chapters.clone(),
            selected_chapter_id: self.selected_chapter_id.clone(),
            style: self.style,
            analysis: self.document(),
            analysis_mode: self.analysis_mode,
            quiz_answers: self.quiz.answers().to_vec(),
            quiz_loading_more: self.quiz.is_loading_more(),
            chat: self.chat.entries().to_vec(),
            chat_pending: self.chat.is_pending(),
            chat_error: self.chat.last_error().map(str::to_string),
            error: self.error.clone(),
            user: self.user.clone(),
            drive_authorized: self.drive_token.is_some(),
        }
    }

    fn require(&self, action: &'static str, allowed: &[Status]) -> Result<(), SessionError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                status: self.status,
            })
        }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.epoch += 1;
        Ticket { epoch: self.epoch }
    }

    fn current_ticket(&self) -> Ticket {
        Ticket { epoch: self.epoch }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the input text
    pub fn set_input(&mut self, text: &str) -> Result<(), SessionError> {
        self.require("edit the input", &[Status::Idle])?;
        self.input = text.to_string();
        Ok(())
    }

    /// Append ingested text, separated from existing input by a newline
    pub fn append_input(&mut self, text: &str) -> Result<(), SessionError> {
        self.require("add a document", &[Status::Idle])?;
        if self.input.is_empty() {
            self.input = text.to_string();
        } else {
            self.input.push('\n');
            self.input.push_str(text);
        }
        Ok(())
    }

    pub fn set_language(&mut self, language: &str) -> Result<(), SessionError> {
        self.require(
            "change the language",
            &[Status::Idle, Status::Configuring, Status::Success, Status::Error],
        )?;
        let language = language.trim();
        if language.is_empty() {
            return Err(SessionError::EmptyLanguage);
        }
        self.language = language.to_string();
        Ok(())
    }

    pub fn set_user(&mut self, user: Option<UserProfile>) {
        self.user = user;
    }

    /// Store the picker's access token. Storing the current token again is a no-op.
    pub fn authorize_drive(&mut self, token: &str) {
        let token = token.trim();
        if token.is_empty() || self.drive_token.as_deref() == Some(token) {
            return;
        }

        if self.drive_token.is_none() {
            tracing::info!(session = %self.id, "Drive picker authorized");
        } else {
            tracing::debug!(session = %self.id, "Drive access token refreshed");
        }
        self.drive_token = Some(token.to_string());
    }

    pub fn drive_token(&self) -> Option<&str> {
        self.drive_token.as_deref()
    }

    /// Forget a token Drive rejected, unless it was replaced meanwhile
    pub fn revoke_drive(&mut self, rejected: &str) {
        if self.drive_token.as_deref() == Some(rejected) {
            self.drive_token = None;
            tracing::info!(session = %self.id, "Drive access token revoked");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Detection
    // ─────────────────────────────────────────────────────────────────────────

    /// IDLE → PARSING
    pub fn begin_detection(&mut self) -> Result<DetectionJob, SessionError> {
        self.require("detect chapters", &[Status::Idle])?;
        if self.input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.status = Status::Parsing;
        self.error = None;
        Ok(DetectionJob {
            ticket: self.next_ticket(),
            text: self.input.clone(),
            language: self.language.clone(),
        })
    }

    /// PARSING → CONFIGURING or ERROR. Returns false if the result was stale.
    pub fn finish_detection(&mut self, ticket: Ticket, result: Result<Vec<Chapter>, String>) -> bool {
        if !self.is_current(ticket) || self.status != Status::Parsing {
            return false;
        }

        match result {
            Ok(chapters) => {
                self.chapters = chapters;
                self.selected_chapter_id = None;
                self.status = Status::Configuring;
            }
            Err(message) => {
                self.error = Some(message);
                self.status = Status::Error;
            }
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Select the chapter to analyze; ids outside the detected list are rejected
    pub fn select_chapter(&mut self, chapter_id: &str) -> Result<(), SessionError> {
        self.require("select a chapter", &[Status::Configuring])?;
        if !self.chapters.iter().any(|c| c.id == chapter_id) {
            return Err(SessionError::UnknownChapter(chapter_id.to_string()));
        }
        self.selected_chapter_id = Some(chapter_id.to_string());
        Ok(())
    }

    pub fn set_style(&mut self, style: AnalysisStyle) -> Result<(), SessionError> {
        self.require("change the analysis style", &[Status::Configuring])?;
        self.style = style;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analysis
    // ─────────────────────────────────────────────────────────────────────────

    /// CONFIGURING → LOADING
    pub fn begin_analysis(&mut self) -> Result<AnalysisJob, SessionError> {
        self.require("start an analysis", &[Status::Configuring])?;
        let chapter = self.selected_chapter().ok_or(SessionError::NoChapterSelected)?;
        let chapter_id = chapter.id.clone();
        let chapter_title = chapter.title.clone();

        self.status = Status::Loading;
        self.error = None;
        Ok(AnalysisJob {
            ticket: self.next_ticket(),
            text: self.input.clone(),
            chapter_id,
            chapter_title,
            style: self.style,
            language: self.language.clone(),
        })
    }

    /// LOADING → SUCCESS, or back to CONFIGURING with the error kept for display
    pub fn finish_analysis(
        &mut self,
        job: &AnalysisJob,
        result: Result<AnalysisOutcome, String>,
    ) -> bool {
        if !self.is_current(job.ticket) || self.status != Status::Loading {
            return false;
        }

        match result {
            Ok(outcome) => {
                if let Some(chapter) = self.chapters.iter_mut().find(|c| c.id == job.chapter_id) {
                    chapter.studied = true;
                }
                self.quiz = QuizBoard::new(outcome.analysis.quiz.clone());
                self.analysis = Some(outcome.analysis);
                self.analysis_mode = Some(outcome.mode);
                self.chat.clear();
                self.status = Status::Success;
            }
            Err(message) => {
                self.error = Some(message);
                self.status = Status::Configuring;
            }
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// SUCCESS → CONFIGURING (drops the analysis view, keeps chapters);
    /// CONFIGURING → IDLE (keeps the input text)
    pub fn back(&mut self) -> Result<(), SessionError> {
        match self.status {
            Status::Success => {
                self.analysis = None;
                self.analysis_mode = None;
                self.quiz = QuizBoard::default();
                self.chat.clear();
                self.status = Status::Configuring;
            }
            Status::Configuring => {
                self.chapters.clear();
                self.selected_chapter_id = None;
                self.error = None;
                self.status = Status::Idle;
            }
            status => {
                return Err(SessionError::InvalidState {
                    action: "go back",
                    status,
                })
            }
        }
        self.epoch += 1;
        Ok(())
    }

    /// Any state → IDLE, clearing input, chapters, analysis, chat and error.
    /// Language and signed-in user are kept.
    pub fn reset(&mut self) {
        self.status = Status::Idle;
        self.input.clear();
        self.chapters.clear();
        self.selected_chapter_id = None;
        self.style = AnalysisStyle::default();
        self.analysis = None;
        self.analysis_mode = None;
        self.quiz = QuizBoard::default();
        self.chat.clear();
        self.error = None;
        self.epoch += 1;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Quiz
    // ─────────────────────────────────────────────────────────────────────────

    pub fn answer_quiz(&mut self, index: usize, option: usize) -> Result<AnswerState, SessionError> {
        self.require("answer a question", &[Status::Success])?;
        self.quiz.answer(index, option)
    }

    pub fn begin_more_questions(&mut self) -> Result<QuizJob, SessionError> {
        self.require("generate more questions", &[Status::Success])?;
        self.quiz.begin_loading_more()?;
        Ok(QuizJob {
            ticket: self.current_ticket(),
            context: self.input.clone(),
            current_count: self.quiz.questions().len(),
            language: self.language.clone(),
        })
    }

    /// Append generated questions; returns how many were added, or None if stale
    pub fn finish_more_questions(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<QuizQuestion>, String>,
    ) -> Option<usize> {
        if !self.is_current(ticket) || self.status != Status::Success {
            return None;
        }
        match result {
            Ok(more) => Some(self.quiz.finish_loading_more(more)),
            Err(message) => {
                self.quiz.cancel_loading_more();
                self.error = Some(message);
                Some(0)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat
    // ─────────────────────────────────────────────────────────────────────────

    pub fn begin_chat(&mut self, question: &str) -> Result<ChatJob, SessionError> {
        self.require("ask a question", &[Status::Success])?;
        let message_id = self.chat.push_question(question)?;
        Ok(ChatJob {
            ticket: self.current_ticket(),
            message_id,
            context: self.input.clone(),
            question: question.trim().to_string(),
            language: self.language.clone(),
        })
    }

    pub fn finish_chat(&mut self, job: &ChatJob, result: Result<String, String>) -> bool {
        if !self.is_current(job.ticket) {
            return false;
        }
        self.chat.resolve(&job.message_id, result)
    }

    pub fn clear_chat(&mut self) -> Result<(), SessionError> {
        self.require("clear the chat", &[Status::Success])?;
        self.chat.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: &str, title: &str) -> Chapter {
        Chapter {
            id: id.to_string(),
            title: title.to_string(),
            content: String::new(),
            studied: false,
        }
    }

    fn question(text: &str) -> QuizQuestion {
        QuizQuestion {
            question: text.to_string(),
            options: vec!["yes".to_string(), "no".to_string()],
            correct_index: 0,
            explanation: String::new(),
        }
    }

    fn outcome(quiz: Vec<QuizQuestion>) -> AnalysisOutcome {
        let mut analysis = CourseAnalysis::raw_text("Topic", "A---PAGE---B".to_string());
        analysis.quiz = quiz;
        AnalysisOutcome {
            analysis,
            mode: AnalysisMode::Structured,
        }
    }

    fn configuring() -> Session {
        let mut session = Session::new("s1", "english");
        session
            .set_input("Chapter 1: Intro\nChapter 2: Advanced")
            .unwrap();
        let job = session.begin_detection().unwrap();
        assert!(session.finish_detection(
            job.ticket,
            Ok(vec![chapter("1", "Intro"), chapter("2", "Advanced")])
        ));
        session
    }

    fn succeeded() -> Session {
        let mut session = configuring();
        session.select_chapter("2").unwrap();
        let job = session.begin_analysis().unwrap();
        assert!(session.finish_analysis(&job, Ok(outcome(vec![question("q1")]))));
        session
    }

    #[test]
    fn test_detection_moves_through_parsing() {
        let mut session = Session::new("s1", "english");
        session.set_input("text").unwrap();

        let job = session.begin_detection().unwrap();
        assert_eq!(session.status(), Status::Parsing);
        assert_eq!(job.text, "text");
        assert_eq!(job.language, "english");

        assert!(session.finish_detection(job.ticket, Ok(vec![chapter("a", "A")])));
        assert_eq!(session.status(), Status::Configuring);
        assert_eq!(session.chapters().len(), 1);
    }

    #[test]
    fn test_detection_failure_enters_error() {
        let mut session = Session::new("s1", "english");
        session.set_input("text").unwrap();
        let job = session.begin_detection().unwrap();

        assert!(session.finish_detection(job.ticket, Err("boom".to_string())));
        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.error(), Some("boom"));
        assert!(session.begin_detection().is_err());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let mut session = Session::new("s1", "english");
        session.set_input("   \n ").unwrap();
        assert_eq!(session.begin_detection().unwrap_err(), SessionError::EmptyInput);
        assert_eq!(session.status(), Status::Idle);
    }

    #[test]
    fn test_detection_clears_previous_error() {
        let mut session = Session::new("s1", "english");
        session.set_input("text").unwrap();
        let job = session.begin_detection().unwrap();
        session.finish_detection(job.ticket, Err("boom".to_string()));
        session.reset();

        session.set_input("again").unwrap();
        session.begin_detection().unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_select_unknown_chapter_is_noop() {
        let mut session = configuring();
        session.select_chapter("1").unwrap();

        let err = session.select_chapter("missing").unwrap_err();
        assert_eq!(err, SessionError::UnknownChapter("missing".to_string()));
        assert_eq!(session.selected_chapter().unwrap().id, "1");
    }

    #[test]
    fn test_analysis_requires_selection() {
        let mut session = configuring();
        assert_eq!(
            session.begin_analysis().unwrap_err(),
            SessionError::NoChapterSelected
        );
        assert_eq!(session.status(), Status::Configuring);
    }

    #[test]
    fn test_analysis_success_marks_only_selected_chapter() {
        let mut session = configuring();
        session.select_chapter("2").unwrap();
        session.set_style(AnalysisStyle::Hard).unwrap();

        let job = session.begin_analysis().unwrap();
        assert_eq!(session.status(), Status::Loading);
        assert_eq!(job.chapter_title, "Advanced");
        assert_eq!(job.style, AnalysisStyle::Hard);

        assert!(session.finish_analysis(&job, Ok(outcome(vec![question("q1")]))));
        assert_eq!(session.status(), Status::Success);
        assert!(!session.chapters()[0].studied);
        assert!(session.chapters()[1].studied);
        assert_eq!(session.quiz().questions().len(), 1);
    }

    #[test]
    fn test_analysis_failure_returns_to_configuring() {
        let mut session = configuring();
        session.select_chapter("1").unwrap();
        let job = session.begin_analysis().unwrap();

        assert!(session.finish_analysis(&job, Err("model offline".to_string())));
        assert_eq!(session.status(), Status::Configuring);
        assert_eq!(session.error(), Some("model offline"));
        assert_eq!(session.chapters().len(), 2);
        assert_eq!(session.selected_chapter().unwrap().id, "1");

        // retry clears the error
        session.begin_analysis().unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_analysis_resets_chat() {
        let mut session = succeeded();
        let chat = session.begin_chat("question").unwrap();
        session.finish_chat(&chat, Ok("answer".to_string()));
        assert_eq!(session.chat().entries().len(), 2);

        session.back().unwrap();
        session.select_chapter("1").unwrap();
        let job = session.begin_analysis().unwrap();
        session.finish_analysis(&job, Ok(outcome(Vec::new())));
        assert!(session.chat().entries().is_empty());
        assert!(session.chapters().iter().all(|c| c.studied));
    }

    #[test]
    fn test_reset_from_every_state() {
        let mut sessions = vec![Session::new("idle", "english"), configuring(), succeeded()];

        let mut parsing = Session::new("parsing", "english");
        parsing.set_input("x").unwrap();
        parsing.begin_detection().unwrap();
        sessions.push(parsing);

        let mut loading = configuring();
        loading.select_chapter("1").unwrap();
        loading.begin_analysis().unwrap();
        sessions.push(loading);

        let mut errored = Session::new("error", "english");
        errored.set_input("x").unwrap();
        let job = errored.begin_detection().unwrap();
        errored.finish_detection(job.ticket, Err("e".to_string()));
        sessions.push(errored);

        for mut session in sessions {
            session.reset();
            assert_eq!(session.status(), Status::Idle);
            assert!(session.input().is_empty());
            assert!(session.chapters().is_empty());
            assert!(session.document().is_none());
            assert!(session.chat().entries().is_empty());
            assert!(session.error().is_none());
        }
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut session = Session::new("s1", "english");
        session.set_input("text").unwrap();
        let job = session.begin_detection().unwrap();
        session.reset();

        assert!(!session.finish_detection(job.ticket, Ok(vec![chapter("a", "A")])));
        assert_eq!(session.status(), Status::Idle);
        assert!(session.chapters().is_empty());

        let mut session = configuring();
        session.select_chapter("1").unwrap();
        let job = session.begin_analysis().unwrap();
        session.reset();
        assert!(!session.finish_analysis(&job, Ok(outcome(Vec::new()))));
        assert!(session.document().is_none());
    }

    #[test]
    fn test_back_transitions() {
        let mut session = succeeded();
        session.back().unwrap();
        assert_eq!(session.status(), Status::Configuring);
        assert!(session.document().is_none());
        assert_eq!(session.chapters().len(), 2);

        session.back().unwrap();
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.input(), "Chapter 1: Intro\nChapter 2: Advanced");
        assert!(session.chapters().is_empty());

        assert!(session.back().unwrap_err().is_conflict());
    }

    #[test]
    fn test_invalid_state_actions_leave_session_untouched() {
        let mut session = succeeded();
        let before = session.snapshot();

        assert!(session.set_input("new").is_err());
        assert!(session.select_chapter("1").is_err());
        assert!(session.set_style(AnalysisStyle::Basic).is_err());
        assert!(session.begin_analysis().is_err());
        assert!(session.begin_detection().is_err());

        let after = session.snapshot();
        assert_eq!(after.input, before.input);
        assert_eq!(after.status, before.status);
        assert_eq!(after.style, before.style);
    }

    #[test]
    fn test_append_input_uses_newline() {
        let mut session = Session::new("s1", "english");
        session.append_input("first").unwrap();
        session.append_input("second").unwrap();
        assert_eq!(session.input(), "first\nsecond");
    }

    #[test]
    fn test_more_questions_are_appended() {
        let mut session = succeeded();
        session.answer_quiz(0, 1).unwrap();

        let job = session.begin_more_questions().unwrap();
        assert_eq!(job.current_count, 1);
        assert!(session.begin_more_questions().is_err());

        let added = session.finish_more_questions(job.ticket, Ok(vec![question("q2"), question("q3")]));
        assert_eq!(added, Some(2));

        let doc = session.document().unwrap();
        assert_eq!(doc.quiz.len(), 3);
        assert_eq!(doc.quiz[0].question, "q1");
        assert_eq!(session.quiz().answers(), &[Some(1), None, None]);
    }

    #[test]
    fn test_more_questions_failure_releases_lock() {
        let mut session = succeeded();
        let job = session.begin_more_questions().unwrap();
        assert_eq!(
            session.finish_more_questions(job.ticket, Err("quota".to_string())),
            Some(0)
        );
        assert!(!session.quiz().is_loading_more());
        assert_eq!(session.quiz().questions().len(), 1);
        session.begin_more_questions().unwrap();
    }

    #[test]
    fn test_chat_failure_keeps_user_message() {
        let mut session = succeeded();
        let job = session.begin_chat("Why?").unwrap();
        assert!(session.finish_chat(&job, Err("offline".to_string())));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.chat.len(), 1);
        assert_eq!(snapshot.chat_error.as_deref(), Some("offline"));
        assert!(!snapshot.chat_pending);
    }

    #[test]
    fn test_chat_result_after_back_is_dropped() {
        let mut session = succeeded();
        let job = session.begin_chat("Why?").unwrap();
        session.back().unwrap();
        assert!(!session.finish_chat(&job, Ok("late".to_string())));
    }

    #[test]
    fn test_language_change_rules() {
        let mut session = Session::new("s1", "english");
        session.set_language("  español ").unwrap();
        assert_eq!(session.language(), "español");
        assert_eq!(session.set_language(" ").unwrap_err(), SessionError::EmptyLanguage);

        session.set_input("x").unwrap();
        session.begin_detection().unwrap();
        assert!(session.set_language("french").unwrap_err().is_conflict());
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut session = succeeded();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["selectedChapterId"], "2");
        assert_eq!(json["style"], "medium");
        assert_eq!(json["analysisMode"], "structured");
        assert_eq!(json["analysis"]["topicTitle"], "Topic");

        session.reset();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["status"], "IDLE");
        assert!(json["analysis"].is_null());
    }

    #[test]
    fn test_drive_token_stays_with_its_session() {
        let mut alice = Session::new("a", "english");
        let bob = Session::new("b", "english");

        alice.authorize_drive("  alice-token ");
        alice.authorize_drive("");
        assert_eq!(alice.drive_token(), Some("alice-token"));
        assert_eq!(bob.drive_token(), None);

        alice.reset();
        let json = serde_json::to_value(alice.snapshot()).unwrap();
        assert_eq!(json["driveAuthorized"], true);
        assert!(!json.to_string().contains("alice-token"));

        alice.revoke_drive("older-token");
        assert_eq!(alice.drive_token(), Some("alice-token"));
        alice.revoke_drive("alice-token");
        assert_eq!(alice.drive_token(), None);
        assert!(!alice.snapshot().drive_authorized);
    }
}
