//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! Handlers only translate messages into [`crate::flow::Inbound`] values, so
//! the conversation itself is tested without Telegram.

mod schema;
mod types;

pub use schema::schema;
pub use types::{inbound_from, HandlerDeps, HandlerError};
