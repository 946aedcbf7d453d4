//! Outbound side of the chat transport
//!
//! The conversation layer only ever sends text, optionally with a reply
//! keyboard. The Telegram implementation lives in `telegram::transport`.

use async_trait::async_trait;

use crate::core::error::AppResult;

/// Reply keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Rows of labeled buttons
    Reply { rows: Vec<Vec<String>>, one_time: bool },
    /// Hide any keyboard currently shown
    Remove,
}

impl Keyboard {
    /// Persistent keyboard from rows of labels
    pub fn rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Keyboard::Reply {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
            one_time: false,
        }
    }

    /// Single-button keyboard that hides after use
    pub fn one_time_button(label: impl Into<String>) -> Self {
        Keyboard::Reply {
            rows: vec![vec![label.into()]],
            one_time: true,
        }
    }

    /// All button labels, row by row
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Keyboard::Reply { rows, .. } => rows.iter().flatten().map(String::as_str).collect(),
            Keyboard::Remove => Vec::new(),
        }
    }
}

/// Sends text to a chat identity.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<()>;
}
