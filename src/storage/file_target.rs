//! Generic downloadable-file target
//!
//! Used when the configured link is not a live Google spreadsheet (a Drive
//! share link, OneDrive, or a direct URL to an xlsx/xls/ods file). The file is
//! downloaded and parsed, and the wallet is deduplicated in memory. These
//! hosts offer no write API, so "publishing" the updated table is a
//! best-effort placeholder: it reports success without writing the row back.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Reader};
use reqwest::Client;
use thiserror::Error;

use super::record::{header_row, Registration, HEADER, WALLET_COLUMN};
use crate::core::config;
use crate::core::error::AppResult;

/// Errors of the file target
#[derive(Debug, Error)]
pub enum FileTargetError {
    #[error("invalid Google Drive URL format")]
    InvalidDriveUrl,

    #[error("failed to parse spreadsheet file: {0}")]
    Parse(String),
}

/// Header plus data rows of a downloaded workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Table with only the canonical header
    pub fn empty() -> Self {
        Self {
            header: header_row(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from raw rows; the first row is the header.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::empty();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    fn wallet_index(&self) -> Option<usize> {
        let name = HEADER[WALLET_COLUMN - 1];
        self.header.iter().position(|h| h.trim() == name)
    }

    /// True iff the user-wallet column holds `wallet` (case-insensitive).
    pub fn contains_wallet(&self, wallet: &str) -> bool {
        let Some(idx) = self.wallet_index() else {
            return false;
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .any(|w| w.trim().eq_ignore_ascii_case(wallet))
    }

    /// Appends a registration, mapping fields by header name.
    pub fn push(&mut self, record: &Registration) {
        let cells = record.to_row();
        let row = self
            .header
            .iter()
            .map(|h| {
                HEADER
                    .iter()
                    .position(|name| *name == h.trim())
                    .map(|i| cells[i].clone())
                    .unwrap_or_default()
            })
            .collect();
        self.rows.push(row);
    }
}

/// Extracts a Google Drive file id from `/file/d/<id>/` or `id=<id>` links.
pub fn drive_file_id(url: &str) -> Result<String, FileTargetError> {
    let id = if let Some((_, rest)) = url.split_once("/file/d/") {
        rest.split('/').next()
    } else if let Some((_, rest)) = url.split_once("id=") {
        rest.split('&').next()
    } else {
        None
    };
    id.filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(FileTargetError::InvalidDriveUrl)
}

fn is_onedrive(url: &str) -> bool {
    url.contains("1drv.ms") || url.contains("onedrive.live.com")
}

/// Rewrites share links into direct download links.
pub fn download_url(url: &str) -> Result<String, FileTargetError> {
    if url.contains("drive.google.com") {
        Ok(format!(
            "https://drive.google.com/uc?export=download&id={}",
            drive_file_id(url)?
        ))
    } else if is_onedrive(url) {
        Ok(url.replace("view.aspx", "download.aspx"))
    } else {
        Ok(url.to_string())
    }
}

/// Parses the first worksheet of an xlsx/xls/ods file.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<Table, FileTargetError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| FileTargetError::Parse(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FileTargetError::Parse("workbook has no worksheets".to_string()))?
        .map_err(|e| FileTargetError::Parse(e.to_string()))?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Ok(Table::from_rows(rows))
}

/// Downloads, dedups and "publishes" registrations for non-spreadsheet links.
#[derive(Debug, Clone)]
pub struct FileTarget {
    client: Client,
}

impl FileTarget {
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("walletlist/0.4")
            .timeout(config::network::file_download_timeout())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, link: &str) -> Result<Vec<u8>, String> {
        let url = download_url(link).map_err(|e| e.to_string())?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }

    /// Downloads the file behind `link`. A failed download yields `None`.
    pub async fn download(&self, link: &str) -> Option<Vec<u8>> {
        match self.fetch(link).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::error!("Error downloading file: {}", e);
                None
            }
        }
    }

    /// Current table behind `link`; an empty table when the download fails.
    pub async fn load(&self, link: &str) -> Result<Table, FileTargetError> {
        match self.download(link).await {
            Some(bytes) => parse_workbook(bytes),
            None => Ok(Table::empty()),
        }
    }

    /// Best-effort publish of the updated table.
    ///
    /// Drive and OneDrive links have no write path and report success; a
    /// direct link is only checked for reachability. Errors are logged and
    /// still reported as success.
    pub async fn publish(&self, table: &Table, link: &str) -> bool {
        if link.contains("drive.google.com") || is_onedrive(link) {
            log::warn!(
                "⚠️ {} has no write API, {} row(s) were not written back",
                link,
                table.rows.len()
            );
            return true;
        }

        match self.client.head(link).send().await.and_then(|r| r.error_for_status()) {
            Ok(_) => log::warn!("⚠️ Direct link {} is reachable but read-only, row not written back", link),
            Err(e) => log::error!("Error uploading to service: {}", e),
        }
        true
    }

    /// Adds `record` unless its wallet is already listed.
    ///
    /// Returns `Ok(false)` on a duplicate wallet.
    pub async fn save(&self, link: &str, record: &Registration) -> Result<bool, FileTargetError> {
        let mut table = self.load(link).await?;
        if table.contains_wallet(&record.user_wallet) {
            log::error!("Wallet already exists");
            return Ok(false);
        }
        table.push(record);
        Ok(self.publish(&table, link).await)
    }
}
