//! Test doubles for the model traits.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ChatModel, Message};
use crate::core::errors::ApiError;

/// Plays back a fixed sequence of assistant turns, recording the system
/// instruction passed on each call.
pub struct ScriptedModel {
    turns: Mutex<VecDeque<Message>>,
    pub seen_system: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<Message>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            seen_system: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(
        &self,
        system: &str,
        _messages: &[Message],
        _tools: &[Value],
    ) -> Result<Message, ApiError> {
        self.seen_system.lock().unwrap().push(system.to_string());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Internal("script exhausted".into()))
    }
}
