use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::error::{AppError, AppResult};
use crate::flow::{ChatTransport, Keyboard};

/// One recorded outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Transport that records instead of sending.
///
/// Chats marked unreachable fail like a blocked bot would.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    unreachable: Mutex<HashSet<i64>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sends to `chat_id` fail.
    pub fn mark_unreachable(&self, chat_id: i64) {
        lock(&self.unreachable).insert(chat_id);
    }

    /// Every message sent so far
    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// Messages sent to one chat
    pub fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        lock(&self.sent).iter().filter(|m| m.chat_id == chat_id).cloned().collect()
    }

    /// Last message sent to one chat
    pub fn last_to(&self, chat_id: i64) -> Option<SentMessage> {
        self.sent_to(chat_id).pop()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        if lock(&self.unreachable).contains(&chat_id) {
            return Err(AppError::Transport(format!("chat {} is unreachable", chat_id)));
        }
        lock(&self.sent).push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }
}
