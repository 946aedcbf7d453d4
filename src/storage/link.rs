//! Spreadsheet link configuration
//!
//! The administrator-configured link is a single text value stored in a file
//! and cached in memory. It is read by every persistence operation and
//! replaced wholesale by `/setlink`.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use super::GatewayError;

/// Where a configured link points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A live Google spreadsheet, addressed by its identifier.
    Spreadsheet { sheet_id: String },
    /// Any other downloadable file (Drive share, OneDrive, direct URL).
    File { url: String },
}

/// Returns true when the link addresses a Google spreadsheet.
pub fn is_spreadsheet_link(link: &str) -> bool {
    link.contains("docs.google.com/spreadsheets")
}

/// Extracts the spreadsheet identifier: the segment between `/d/` and the next `/`.
pub fn extract_sheet_id(link: &str) -> Result<String, GatewayError> {
    let (_, rest) = link.split_once("/d/").ok_or(GatewayError::MalformedLink)?;
    let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if id.is_empty() {
        return Err(GatewayError::MalformedLink);
    }
    Ok(id.to_string())
}

/// Classifies a link.
pub fn classify(link: &str) -> Result<LinkTarget, GatewayError> {
    if is_spreadsheet_link(link) {
        Ok(LinkTarget::Spreadsheet {
            sheet_id: extract_sheet_id(link)?,
        })
    } else {
        Ok(LinkTarget::File { url: link.to_string() })
    }
}

/// File-backed holder of the configured spreadsheet link.
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl LinkStore {
    /// Opens the store, reading the current value if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match fs_err::tokio::read_to_string(&path).await {
            Ok(text) => Some(text.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::error!("Error reading link file: {}", e);
                None
            }
        };
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current link, if one has been set
    pub async fn get(&self) -> Option<String> {
        self.cached.read().await.clone()
    }

    /// Current link or `LinkNotConfigured`
    pub async fn require(&self) -> Result<String, GatewayError> {
        self.get().await.ok_or(GatewayError::LinkNotConfigured)
    }

    /// Replaces the link, writing it through to the file.
    pub async fn set(&self, link: &str) -> std::io::Result<()> {
        let link = link.trim();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        let mut cached = self.cached.write().await;
        fs_err::tokio::write(&self.path, link).await?;
        *cached = Some(link.to_string());
        log::info!("🔗 Spreadsheet link updated ({})", self.path.display());
        Ok(())
    }
}
