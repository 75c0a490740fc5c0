//! Chat transcript with provisional entries
//!
//! A question is appended as `Pending` before the model is called. When the
//! call resolves the entry becomes `Confirmed` (and the answer is appended)
//! or `Failed` (and nothing is appended). Only one question may be pending.

use super::SessionError;
use crate::models::{ChatMessage, ChatRole};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
    next_id: u64,
    pending: Option<String>,
    last_error: Option<String>,
}

impl Transcript {
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("msg-{}", self.next_id)
    }

    /// Append the user's question provisionally and return its id
    pub fn push_question(&mut self, text: &str) -> Result<String, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::Busy("chat"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let id = self.allocate_id();
        self.entries.push(ChatEntry {
            message: ChatMessage {
                id: id.clone(),
                role: ChatRole::User,
                text: text.to_string(),
            },
            delivery: Delivery::Pending,
        });
        self.pending = Some(id.clone());
        self.last_error = None;
        Ok(id)
    }

    /// Settle a pending question. Returns false when the entry no longer
    /// exists (the transcript was cleared meanwhile) and the result is dropped.
    pub fn resolve(&mut self, id: &str, answer: Result<String, String>) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.message.id == id) else {
            return false;
        };
        if self.pending.as_deref() == Some(id) {
            self.pending = None;
        }

        match answer {
            Ok(text) => {
                self.entries[pos].delivery = Delivery::Confirmed;
                let bot_id = self.allocate_id();
                self.entries.push(ChatEntry {
                    message: ChatMessage {
                        id: bot_id,
                        role: ChatRole::Bot,
                        text,
                    },
                    delivery: Delivery::Confirmed,
                });
            }
            Err(message) => {
                self.entries[pos].delivery = Delivery::Failed;
                self.last_error = Some(message);
            }
        }
        true
    }

    /// Drop every entry and any pending question
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
        self.last_error = None;
    }
}
