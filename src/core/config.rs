use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Telegram ID of the administrator
/// Read from ADMIN_ID environment variable
/// `None` when unset or not a number: the admin menu and admin alerts are disabled
pub static ADMIN_ID: Lazy<Option<i64>> = Lazy::new(|| env::var("ADMIN_ID").ok().and_then(|v| v.trim().parse().ok()));

/// Language of admin-facing texts (menu, alerts)
/// Read from ADMIN_LANGUAGE environment variable
/// Default: en
pub static ADMIN_LANGUAGE: Lazy<String> =
    Lazy::new(|| env::var("ADMIN_LANGUAGE").unwrap_or_else(|_| "en".to_string()));

/// Path of the text file holding the spreadsheet link
/// Read from SHEET_LINK_FILE environment variable
/// Default: data/sheet_link.txt
pub static SHEET_LINK_FILE: Lazy<String> =
    Lazy::new(|| env::var("SHEET_LINK_FILE").unwrap_or_else(|_| "data/sheet_link.txt".to_string()));

/// Service-account key of the primary spreadsheet context
/// Read from SHEETS_PRIMARY_CREDENTIALS environment variable
/// Default: key_sheets.json
pub static SHEETS_PRIMARY_CREDENTIALS: Lazy<String> =
    Lazy::new(|| env::var("SHEETS_PRIMARY_CREDENTIALS").unwrap_or_else(|_| "key_sheets.json".to_string()));

/// Service-account key of the secondary spreadsheet context
/// Read from SHEETS_SECONDARY_CREDENTIALS environment variable
/// Default: key_drive.json
pub static SHEETS_SECONDARY_CREDENTIALS: Lazy<String> =
    Lazy::new(|| env::var("SHEETS_SECONDARY_CREDENTIALS").unwrap_or_else(|_| "key_drive.json".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Spreadsheet backend configuration
pub mod sheets {
    use super::{env, Duration, Lazy};

    /// Default timeout for a single backend attempt (in seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Timeout for a single backend attempt, read from SHEETS_TIMEOUT_SECS
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("SHEETS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    });

    /// Google Sheets v4 REST endpoint
    pub const API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

    /// OAuth scopes requested for service-account tokens
    pub const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

    /// Access tokens are refreshed this long before they expire (in seconds)
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

    /// Backend attempt timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram API requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Timeout for downloading generic spreadsheet files (in seconds)
    pub const FILE_DOWNLOAD_TIMEOUT_SECS: u64 = 20;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// File download timeout duration
    pub fn file_download_timeout() -> Duration {
        Duration::from_secs(FILE_DOWNLOAD_TIMEOUT_SECS)
    }
}

/// Notification configuration
pub mod notify {
    use super::Duration;

    /// Upper bound for a best-effort notification (in seconds)
    pub const SEND_TIMEOUT_SECS: u64 = 5;

    /// Notification timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(SEND_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheets_timeout_is_positive() {
        assert!(sheets::timeout() > Duration::ZERO);
    }

    #[test]
    fn test_network_durations() {
        assert_eq!(network::timeout(), Duration::from_secs(network::REQUEST_TIMEOUT_SECS));
        assert_eq!(
            network::file_download_timeout(),
            Duration::from_secs(network::FILE_DOWNLOAD_TIMEOUT_SECS)
        );
        assert_eq!(notify::timeout(), Duration::from_secs(5));
    }
}
