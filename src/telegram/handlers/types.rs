//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::Message;

use crate::flow::{Inbound, RegistrationFlow};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone, Debug)]
pub struct HandlerDeps {
    pub flow: Arc<RegistrationFlow>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(flow: Arc<RegistrationFlow>) -> Self {
        Self { flow }
    }
}

/// Converts a Telegram text message into the conversation's input.
///
/// Returns `None` for messages without text or sender.
pub fn inbound_from(msg: &Message) -> Option<Inbound> {
    let user = msg.from.as_ref()?;
    let user_id = i64::try_from(user.id.0).ok()?;
    let text = msg.text()?;
    Some(Inbound::new(msg.chat.id.0, user_id, user.username.as_deref(), text))
}
