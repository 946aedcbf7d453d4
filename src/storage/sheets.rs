//! Spreadsheet gateway with primary → secondary fallback
//!
//! Every operation is written once as a closure over a [`SheetBackend`] and
//! run through [`SheetGateway::with_fallback`], which tries each configured
//! context in order. A context failure (API error, auth error, timeout) is
//! logged and the next context is tried; if every context fails the caller
//! sees [`GatewayError::SheetUnreachable`]. There is no backoff: one attempt per
//! context.
//!
//! A later attempt may run after an earlier one already wrote, so writes that
//! depend on a read (the duplicate check) redo that read inside each attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::link::extract_sheet_id;
use super::record::{header_row, PendingEntry, Registration, Status, HEADER, ID_COLUMN, STATUS_COLUMN, WALLET_COLUMN};

/// Failure of a single backend attempt.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("spreadsheet API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced to gateway callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("spreadsheet link is not configured")]
    LinkNotConfigured,

    #[error("spreadsheet is unreachable with every configured context")]
    SheetUnreachable,

    #[error("spreadsheet link does not contain an identifier")]
    MalformedLink,

    #[error("spreadsheet is empty")]
    EmptySheet,
}

/// Cell-level access to the first worksheet of a spreadsheet.
///
/// Rows and columns are 1-based, like the A1 notation they map to.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Opens the spreadsheet, failing when it is missing or not shared with this context.
    async fn open(&self, sheet_id: &str) -> Result<(), SheetError>;

    /// All values of one column, top to bottom. Empty when the column has no data.
    async fn column_values(&self, sheet_id: &str, column: usize) -> Result<Vec<String>, SheetError>;

    /// Every non-empty row, top to bottom.
    async fn all_values(&self, sheet_id: &str) -> Result<Vec<Vec<String>>, SheetError>;

    /// Appends a row after the last non-empty row.
    async fn append_row(&self, sheet_id: &str, row: &[String]) -> Result<(), SheetError>;

    /// Inserts a row at `index`, shifting existing rows down.
    async fn insert_row(&self, sheet_id: &str, index: usize, row: &[String]) -> Result<(), SheetError>;

    /// Overwrites a single cell.
    async fn update_cell(&self, sheet_id: &str, row: usize, column: usize, value: &str) -> Result<(), SheetError>;
}

/// One named authorization context.
#[derive(Clone)]
pub struct SheetContext {
    pub name: String,
    pub backend: Arc<dyn SheetBackend>,
}

impl SheetContext {
    pub fn new(name: impl Into<String>, backend: Arc<dyn SheetBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }
}

impl std::fmt::Debug for SheetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetContext").field("name", &self.name).finish()
    }
}

/// Outcome of `list_pending` against one backend.
enum Listing {
    Pending(Vec<PendingEntry>),
    Empty,
}

/// True iff the wallet column holds `wallet` (case-insensitive), header excluded.
async fn wallet_listed(backend: &dyn SheetBackend, sheet_id: &str, wallet: &str) -> Result<bool, SheetError> {
    let wallets = backend.column_values(sheet_id, WALLET_COLUMN).await?;
    let skip_header = wallets
        .first()
        .is_some_and(|first| first == HEADER[WALLET_COLUMN - 1]);
    Ok(wallets
        .iter()
        .skip(usize::from(skip_header))
        .any(|w| w.trim().eq_ignore_ascii_case(wallet)))
}

/// Appends `row`, writing the header first when the sheet has no rows.
///
/// The emptiness re-check runs under `header_lock` so concurrent first
/// writers in this process add one header between them.
async fn append_with_header(
    backend: &dyn SheetBackend,
    sheet_id: &str,
    row: &[String],
    header_lock: &Mutex<()>,
) -> Result<(), SheetError> {
    if backend.all_values(sheet_id).await?.is_empty() {
        let _guard = header_lock.lock().await;
        if backend.all_values(sheet_id).await?.is_empty() {
            backend.append_row(sheet_id, &header_row()).await?;
        }
    }
    backend.append_row(sheet_id, row).await
}

/// Gateway over an ordered list of authorization contexts.
#[derive(Debug, Clone)]
pub struct SheetGateway {
    contexts: Vec<SheetContext>,
    attempt_timeout: Duration,
    header_lock: Arc<Mutex<()>>,
}

impl SheetGateway {
    /// Creates a gateway; contexts are tried in the given order.
    pub fn new(contexts: Vec<SheetContext>, attempt_timeout: Duration) -> Self {
        if contexts.is_empty() {
            log::error!("❌ No spreadsheet contexts configured, every sheet operation will fail");
        }
        Self {
            contexts,
            attempt_timeout,
            header_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Names of the configured contexts, in fallback order
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Runs `op` against each context until one succeeds.
    async fn with_fallback<T, F, Fut>(&self, operation: &str, op: F) -> Result<(T, &str), GatewayError>
    where
        F: Fn(Arc<dyn SheetBackend>) -> Fut,
        Fut: Future<Output = Result<T, SheetError>>,
    {
        for context in &self.contexts {
            let attempt = tokio::time::timeout(self.attempt_timeout, op(Arc::clone(&context.backend))).await;
            match attempt {
                Ok(Ok(value)) => {
                    log::info!("Sheet {} succeeded using {} context", operation, context.name);
                    return Ok((value, context.name.as_str()));
                }
                Ok(Err(e)) => {
                    log::error!("Sheet {} failed with {} context: {}", operation, context.name, e);
                }
                Err(_) => {
                    log::error!(
                        "Sheet {} failed with {} context: {}",
                        operation,
                        context.name,
                        SheetError::Timeout(self.attempt_timeout)
                    );
                }
            }
        }
        Err(GatewayError::SheetUnreachable)
    }

    /// Checks that the spreadsheet can be opened; returns the answering context's name.
    pub async fn probe(&self, link: &str) -> Result<String, GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let (_, name) = self
            .with_fallback("probe", |backend| {
                let sheet_id = sheet_id.clone();
                async move { backend.open(&sheet_id).await }
            })
            .await?;
        Ok(name.to_string())
    }

    /// True iff a registration with this wallet (case-insensitive) exists.
    pub async fn find_by_wallet(&self, link: &str, wallet: &str) -> Result<bool, GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let (found, _) = self
            .with_fallback("find_by_wallet", |backend| {
                let sheet_id = sheet_id.clone();
                async move {
                    backend.open(&sheet_id).await?;
                    wallet_listed(backend.as_ref(), &sheet_id, wallet).await
                }
            })
            .await?;
        Ok(found)
    }

    /// Appends a registration row, writing the header first on an empty sheet.
    pub async fn append_registration(&self, link: &str, record: &Registration) -> Result<(), GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let row = record.to_row();
        let header_lock = self.header_lock.as_ref();
        self.with_fallback("append_registration", |backend| {
            let sheet_id = sheet_id.clone();
            let row = row.clone();
            async move {
                backend.open(&sheet_id).await?;
                append_with_header(backend.as_ref(), &sheet_id, &row, header_lock).await
            }
        })
        .await?;
        log::info!("Successfully added new row to sheet");
        Ok(())
    }

    /// Appends a registration unless its wallet is already listed.
    ///
    /// The lookup and the append share one attempt, so a context that wrote
    /// the row before failing leaves it visible to the next context, which
    /// then reports the wallet as taken. Returns `false` on a duplicate.
    pub async fn append_if_absent(&self, link: &str, record: &Registration) -> Result<bool, GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let row = record.to_row();
        let wallet = record.user_wallet.as_str();
        let header_lock = self.header_lock.as_ref();
        let (appended, _) = self
            .with_fallback("append_if_absent", |backend| {
                let sheet_id = sheet_id.clone();
                let row = row.clone();
                async move {
                    backend.open(&sheet_id).await?;
                    if wallet_listed(backend.as_ref(), &sheet_id, wallet).await? {
                        return Ok(false);
                    }
                    append_with_header(backend.as_ref(), &sheet_id, &row, header_lock).await?;
                    Ok(true)
                }
            })
            .await?;
        if appended {
            log::info!("Successfully added new row to sheet");
        }
        Ok(appended)
    }

    /// Writes `status` into the first row whose ID cell equals `telegram_id`.
    ///
    /// Returns `false` when no row matches or the sheet is empty.
    pub async fn update_status(&self, link: &str, telegram_id: i64, status: Status) -> Result<bool, GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let needle = telegram_id.to_string();
        let (updated, _) = self
            .with_fallback("update_status", |backend| {
                let sheet_id = sheet_id.clone();
                let needle = needle.clone();
                async move {
                    backend.open(&sheet_id).await?;
                    let values = backend.all_values(&sheet_id).await?;
                    if values.is_empty() {
                        log::error!("Empty sheet");
                        return Ok(false);
                    }
                    let Some(index) = values
                        .iter()
                        .position(|row| row.get(ID_COLUMN - 1).is_some_and(|cell| *cell == needle))
                    else {
                        log::error!("User {} not found", needle);
                        return Ok(false);
                    };
                    backend
                        .update_cell(&sheet_id, index + 1, STATUS_COLUMN, status.as_cell())
                        .await?;
                    Ok(true)
                }
            })
            .await?;
        if updated {
            log::info!("Successfully updated status for user {}", telegram_id);
        }
        Ok(updated)
    }

    /// Lists rows whose status cell is empty.
    ///
    /// Columns are resolved by header name. A sheet without the expected
    /// header gets the canonical header inserted on top and reports `EmptySheet`.
    pub async fn list_pending(&self, link: &str) -> Result<Vec<PendingEntry>, GatewayError> {
        let sheet_id = extract_sheet_id(link)?;
        let (listing, _) = self
            .with_fallback("list_pending", |backend| {
                let sheet_id = sheet_id.clone();
                async move {
                    backend.open(&sheet_id).await?;
                    let values = backend.all_values(&sheet_id).await?;
                    let Some((headers, rows)) = values.split_first() else {
                        return Ok(Listing::Empty);
                    };
                    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
                    let (Some(id_idx), Some(username_idx), Some(wallet_idx), Some(status_idx)) = (
                        position(HEADER[0]),
                        position(HEADER[1]),
                        position(HEADER[2]),
                        position(HEADER[4]),
                    ) else {
                        backend.insert_row(&sheet_id, 1, &header_row()).await?;
                        log::warn!("Sheet had no header row, canonical header inserted");
                        return Ok(Listing::Empty);
                    };

                    let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();
                    let pending = rows
                        .iter()
                        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
                        .filter(|row| cell(row, status_idx).trim().is_empty())
                        .map(|row| PendingEntry {
                            telegram_id: cell(row, id_idx),
                            username: cell(row, username_idx),
                            user_wallet: cell(row, wallet_idx),
                        })
                        .collect();
                    Ok(Listing::Pending(pending))
                }
            })
            .await?;
        match listing {
            Listing::Pending(entries) => Ok(entries),
            Listing::Empty => Err(GatewayError::EmptySheet),
        }
    }
}
