//! Scripted in-memory backend for tests

use super::{ModelBackend, ModelError, ModelReply, ModelRequest};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays queued replies in order and records every request.
/// An exhausted script answers with `InvalidResponse`.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, reply: ModelReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn reply_text(&self, text: impl Into<String>) {
        self.reply(ModelReply::from_text(text));
    }

    pub fn reply_error(&self, error: ModelError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ModelBackend for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn generate(&self, request: ModelRequest) -> BoxFuture<'_, Result<ModelReply, ModelError>> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".to_string())));
        Box::pin(async move { next })
    }
}
