//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the registration configuration

use anyhow::Result;
use simplelog::*;
use std::path::Path;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file =
        fs_err::File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the registration configuration at application startup
///
/// Reports:
/// - whether an administrator is configured
/// - which service-account key files exist
/// - where the spreadsheet link is stored
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📋 Whitelist Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match *config::ADMIN_ID {
        Some(admin_id) => log::info!("✅ ADMIN_ID: {}", admin_id),
        None => log::error!("❌ ADMIN_ID: not set - admin menu and alerts are disabled"),
    }

    for (name, path) in [
        ("SHEETS_PRIMARY_CREDENTIALS", config::SHEETS_PRIMARY_CREDENTIALS.as_str()),
        ("SHEETS_SECONDARY_CREDENTIALS", config::SHEETS_SECONDARY_CREDENTIALS.as_str()),
    ] {
        if Path::new(path).exists() {
            log::info!("✅ {}: {}", name, path);
        } else {
            log::warn!("⚠️  {}: {} (FILE NOT FOUND)", name, path);
        }
    }

    let link_file = config::SHEET_LINK_FILE.as_str();
    if Path::new(link_file).exists() {
        log::info!("✅ SHEET_LINK_FILE: {}", link_file);
    } else {
        log::warn!("⚠️  SHEET_LINK_FILE: {} (not set yet, use /setlink)", link_file);
    }

    log::info!("⏱  Spreadsheet attempt timeout: {:?}", config::sheets::timeout());
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // The global logger can only be installed once per process, so a second
        // call in the same test binary may legitimately fail.
        let _ = init_logger(path);

        assert!(temp_file.path().exists());
    }
}
