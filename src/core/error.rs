use thiserror::Error;

/// Centralized error types for the application
///
/// Errors raised inside a conversation step, the CLI and the bot bootstrap are
/// converted to this enum. Spreadsheet failures have their own taxonomy in
/// [`crate::storage::GatewayError`] and are turned into outcomes by the store.
///
/// # Example
///
/// ```no_run
/// use walletlist::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Outbound message could not be delivered
    #[error("Transport error: {0}")]
    Transport(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
