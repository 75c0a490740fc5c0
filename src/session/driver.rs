//! Runs remote work on behalf of sessions
//!
//! Each operation validates and transitions the session under the registry
//! lock, releases the lock, performs the model call on a spawned task and
//! then applies the result through the session's ticket check. Callers get
//! the in-flight snapshot immediately and poll for the outcome.

use super::{Session, SessionError, SessionSnapshot, SessionStore};
use crate::llm::AnalysisClient;
use std::fmt;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Unknown or evicted session id
    NotFound,
    Session(SessionError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Session not found"),
            Self::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<SessionError> for DriverError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

/// A request that has been accepted and is running in the background
pub struct Pending {
    /// Session state right after the request started
    pub snapshot: SessionSnapshot,
    pub task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct SessionDriver {
    store: SessionStore,
    client: AnalysisClient,
}

impl SessionDriver {
    pub fn new(store: SessionStore, client: AnalysisClient) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn client(&self) -> &AnalysisClient {
        &self.client
    }

    /// Apply a synchronous session action
    pub async fn apply<R>(
        &self,
        id: &str,
        action: impl FnOnce(&mut Session) -> Result<R, SessionError>,
    ) -> Result<R, DriverError> {
        self.store
            .with(id, action)
            .await
            .ok_or(DriverError::NotFound)?
            .map_err(DriverError::Session)
    }

    /// Read-only access to a session
    pub async fn view<R>(&self, id: &str, f: impl FnOnce(&Session) -> R) -> Result<R, DriverError> {
        self.store
            .with(id, |s| f(s))
            .await
            .ok_or(DriverError::NotFound)
    }

    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, DriverError> {
        self.view(id, Session::snapshot).await
    }

    async fn begin<J>(
        &self,
        id: &str,
        start: impl FnOnce(&mut Session) -> Result<J, SessionError>,
    ) -> Result<(J, SessionSnapshot), DriverError> {
        self.apply(id, |s| {
            let job = start(s)?;
            Ok((job, s.snapshot()))
        })
        .await
    }

    /// IDLE → PARSING now; CONFIGURING or ERROR when the model answers
    pub async fn detect(&self, id: &str) -> Result<Pending, DriverError> {
        let (job, snapshot) = self.begin(id, Session::begin_detection).await?;
        let driver = self.clone();
        let id = id.to_string();

        let task = tokio::spawn(async move {
            let result = driver
                .client
                .detect_chapters(&job.text, &job.language)
                .await
                .map_err(|e| {
                    tracing::warn!(session = %id, error = %e, "Chapter detection failed");
                    format!("Error detecting chapters: {}", e)
                });

            let applied = driver
                .store
                .with(&id, |s| s.finish_detection(job.ticket, result))
                .await
                .unwrap_or(false);
            if !applied {
                tracing::debug!(session = %id, "Discarded stale detection result");
            }
        });

        Ok(Pending { snapshot, task })
    }

    /// CONFIGURING → LOADING now; SUCCESS or back to CONFIGURING later
    pub async fn analyze(&self, id: &str) -> Result<Pending, DriverError> {
        let (job, snapshot) = self.begin(id, Session::begin_analysis).await?;
        let driver = self.clone();
        let id = id.to_string();

        let task = tokio::spawn(async move {
            tracing::info!(
                session = %id,
                chapter = %job.chapter_title,
                style = %job.style,
                "Starting analysis"
            );
            let result = driver
                .client
                .analyze_course_content(&job.text, job.style, &job.chapter_title, &job.language)
                .await
                .map_err(|e| {
                    tracing::warn!(session = %id, error = %e, "Analysis failed");
                    format!("Error analyzing content: {}", e)
                });

            if let Ok(outcome) = &result {
                tracing::info!(session = %id, mode = ?outcome.mode, "Analysis complete");
            }

            let applied = driver
                .store
                .with(&id, |s| s.finish_analysis(&job, result))
                .await
                .unwrap_or(false);
            if !applied {
                tracing::debug!(session = %id, "Discarded stale analysis result");
            }
        });

        Ok(Pending { snapshot, task })
    }

    /// Append another batch of quiz questions to the current analysis
    pub async fn more_questions(&self, id: &str) -> Result<Pending, DriverError> {
        let (job, snapshot) = self.begin(id, Session::begin_more_questions).await?;
        let driver = self.clone();
        let id = id.to_string();

        let task = tokio::spawn(async move {
            let result = driver
                .client
                .generate_more_questions(&job.context, job.current_count, &job.language)
                .await
                .map_err(|e| {
                    tracing::warn!(session = %id, error = %e, "Question generation failed");
                    format!("Could not generate more questions: {}", e)
                });

            let added = driver
                .store
                .with(&id, |s| s.finish_more_questions(job.ticket, result))
                .await
                .flatten();
            match added {
                Some(n) => tracing::debug!(session = %id, added = n, "Quiz extended"),
                None => tracing::debug!(session = %id, "Discarded stale quiz result"),
            }
        });

        Ok(Pending { snapshot, task })
    }

    /// Post a question to the chat; the answer is appended when it arrives
    pub async fn ask(&self, id: &str, question: &str) -> Result<Pending, DriverError> {
        let (job, snapshot) = self.begin(id, |s| s.begin_chat(question)).await?;
        let driver = self.clone();
        let id = id.to_string();

        let task = tokio::spawn(async move {
            let result = driver
                .client
                .ask_document_question(&job.context, &job.question, &job.language)
                .await
                .map_err(|e| {
                    tracing::warn!(session = %id, error = %e, "Chat question failed");
                    format!("Could not answer the question: {}", e)
                });

            let applied = driver
                .store
                .with(&id, |s| s.finish_chat(&job, result))
                .await
                .unwrap_or(false);
            if !applied {
                tracing::debug!(session = %id, "Discarded stale chat answer");
            }
        });

        Ok(Pending { snapshot, task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Limits, ModelConfig, SessionsConfig};
    use crate::llm::testing::ScriptedModel;
    use crate::llm::ModelError;
    use crate::session::chat::Delivery;
    use crate::session::Status;
    use std::sync::Arc;

    const CHAPTERS: &str = r#"[
        {"id": "c1", "title": "Intro", "content": "Chapter 1: Intro"},
        {"id": "c2", "title": "Advanced", "content": "Chapter 2: Advanced"}
    ]"#;

    const ANALYSIS: &str = r#"{
        "topicTitle": "Advanced",
        "summary": "A---PAGE---B",
        "keyPoints": ["k"],
        "examples": [],
        "quiz": [{"question": "q", "options": ["a", "b"], "correctIndex": 0, "explanation": "e"}]
    }"#;

    fn driver(model: &Arc<ScriptedModel>) -> SessionDriver {
        let client = AnalysisClient::new(model.clone(), &ModelConfig::default(), Limits::default());
        SessionDriver::new(SessionStore::new(SessionsConfig::default()), client)
    }

    async fn session_with_input(driver: &SessionDriver) -> String {
        let id = driver.store().create("english").await.unwrap().id;
        driver
            .apply(&id, |s| s.set_input("Chapter 1: Intro\nChapter 2: Advanced"))
            .await
            .unwrap();
        id
    }

    async fn session_in_success(driver: &SessionDriver) -> String {
        let id = session_with_input(driver).await;
        driver.detect(&id).await.unwrap().task.await.unwrap();
        driver.apply(&id, |s| s.select_chapter("c2")).await.unwrap();
        driver.analyze(&id).await.unwrap().task.await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_full_flow() {
        let model = ScriptedModel::new();
        model.reply_text(CHAPTERS);
        model.reply_text(ANALYSIS);
        let driver = driver(&model);
        let id = session_with_input(&driver).await;

        let pending = driver.detect(&id).await.unwrap();
        assert_eq!(pending.snapshot.status, Status::Parsing);
        pending.task.await.unwrap();
        assert_eq!(driver.snapshot(&id).await.unwrap().status, Status::Configuring);

        driver.apply(&id, |s| s.select_chapter("c2")).await.unwrap();
        driver
            .apply(&id, |s| s.set_style(crate::models::AnalysisStyle::Hard))
            .await
            .unwrap();
        let pending = driver.analyze(&id).await.unwrap();
        assert_eq!(pending.snapshot.status, Status::Loading);
        pending.task.await.unwrap();

        let snapshot = driver.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.status, Status::Success);
        assert!(!snapshot.chapters[0].studied);
        assert!(snapshot.chapters[1].studied);

        let requests = model.requests();
        assert!(requests[1].prompt.contains("4000 words"));
        assert!(requests[1].prompt.contains("\"Advanced\""));
    }

    #[tokio::test]
    async fn test_detection_failure_sets_error() {
        let model = ScriptedModel::new();
        model.reply_error(ModelError::NetworkError("unreachable".to_string()));
        let driver = driver(&model);
        let id = session_with_input(&driver).await;

        driver.detect(&id).await.unwrap().task.await.unwrap();
        let snapshot = driver.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.status, Status::Error);
        assert!(snapshot.error.unwrap().starts_with("Error detecting chapters"));
    }

    #[tokio::test]
    async fn test_grounded_analysis_has_no_quiz() {
        let model = ScriptedModel::new();
        model.reply_text(CHAPTERS);
        model.reply(crate::llm::ModelReply {
            text: Some("web text".to_string()),
            citations: (0..3)
                .map(|i| crate::models::GroundingUrl {
                    title: format!("s{}", i),
                    uri: format!("https://example.com/{}", i),
                })
                .collect(),
        });
        let driver = driver(&model);
        let id = session_with_input(&driver).await;

        driver.detect(&id).await.unwrap().task.await.unwrap();
        driver
            .apply(&id, |s| {
                s.select_chapter("c1")?;
                s.set_style(crate::models::AnalysisStyle::Internet)
            })
            .await
            .unwrap();
        driver.analyze(&id).await.unwrap().task.await.unwrap();

        let analysis = driver.snapshot(&id).await.unwrap().analysis.unwrap();
        assert_eq!(analysis.grounding_urls().len(), 3);
        assert!(analysis.quiz.is_empty());
    }

    #[tokio::test]
    async fn test_more_questions_and_chat() {
        let model = ScriptedModel::new();
        model.reply_text(CHAPTERS);
        model.reply_text(ANALYSIS);
        model.reply_text(
            r#"[{"question": "q2", "options": ["a", "b"], "correctIndex": 1, "explanation": "e"}]"#,
        );
        model.reply_error(ModelError::NetworkError("offline".to_string()));
        let driver = driver(&model);
        let id = session_in_success(&driver).await;

        let pending = driver.more_questions(&id).await.unwrap();
        assert!(pending.snapshot.quiz_loading_more);
        pending.task.await.unwrap();
        let snapshot = driver.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.analysis.unwrap().quiz.len(), 2);
        assert!(!snapshot.quiz_loading_more);

        let pending = driver.ask(&id, "What is B?").await.unwrap();
        assert!(pending.snapshot.chat_pending);
        assert_eq!(pending.snapshot.chat[0].delivery, Delivery::Pending);
        pending.task.await.unwrap();

        let snapshot = driver.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.chat.len(), 1);
        assert_eq!(snapshot.chat[0].delivery, Delivery::Failed);
        assert!(snapshot.chat_error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_session_and_invalid_state() {
        let model = ScriptedModel::new();
        let driver = driver(&model);

        assert!(matches!(driver.detect("nope").await, Err(DriverError::NotFound)));

        let id = driver.store().create("english").await.unwrap().id;
        assert!(matches!(
            driver.analyze(&id).await,
            Err(DriverError::Session(SessionError::InvalidState { .. }))
        ));
        assert!(matches!(
            driver.detect(&id).await,
            Err(DriverError::Session(SessionError::EmptyInput))
        ));
        assert!(model.requests().is_empty());
    }
}
