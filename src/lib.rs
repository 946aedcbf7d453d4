//! Walletlist - Telegram bot for whitelist wallet registration
//!
//! Users pick a language, submit an EVM wallet and a referrer wallet, and the
//! registration is appended to a Google spreadsheet that the administrator
//! reviews. The administrator approves registrations from the same chat.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and address validation
//! - `storage`: Link configuration, spreadsheet gateway, and registration store
//! - `flow`: Conversation state machine and notifications
//! - `telegram`: Telegram bot integration and handlers
//! - `testing`: In-memory fakes for tests

pub mod cli;
pub mod core;
pub mod flow;
pub mod i18n;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use flow::{Inbound, RegistrationFlow};
pub use storage::{RegistrationStore, SaveOutcome};
