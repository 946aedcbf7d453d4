//! Registration store: the write path behind a completed conversation
//!
//! Reads the configured link, picks the spreadsheet gateway or the generic
//! file target, and turns backend failures into outcomes plus a log entry.
//! Saves of the same wallet (case-insensitive) are serialized in-process so
//! two sessions cannot both pass the duplicate check before either appends.
//! Saves of different wallets run concurrently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::file_target::FileTarget;
use super::link::{classify, LinkStore, LinkTarget};
use super::record::{PendingEntry, Registration, Status};
use super::sheets::{GatewayError, SheetGateway};

/// Result of `save_registration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    DuplicateWallet,
    Failed,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Façade over the link configuration, the gateway and the file target.
#[derive(Debug)]
pub struct RegistrationStore {
    link: Arc<LinkStore>,
    gateway: SheetGateway,
    files: FileTarget,
    /// One lock per lowercased wallet, dropped once no save holds it
    wallet_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RegistrationStore {
    pub fn new(link: Arc<LinkStore>, gateway: SheetGateway, files: FileTarget) -> Self {
        Self {
            link,
            gateway,
            files,
            wallet_locks: DashMap::new(),
        }
    }

    /// Shared link configuration
    pub fn link(&self) -> &Arc<LinkStore> {
        &self.link
    }

    /// Underlying spreadsheet gateway
    pub fn gateway(&self) -> &SheetGateway {
        &self.gateway
    }

    /// True once an administrator has set a link.
    pub async fn is_configured(&self) -> bool {
        self.link.get().await.is_some()
    }

    fn wallet_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.wallet_locks.entry(key.to_string()).or_default())
    }

    /// Persists a registration unless its wallet already exists.
    pub async fn save_registration(&self, record: &Registration) -> SaveOutcome {
        let key = record.user_wallet.to_ascii_lowercase();
        let lock = self.wallet_lock(&key);
        let outcome = {
            let _guard = lock.lock().await;
            self.save_exclusive(record).await
        };
        drop(lock);
        self.wallet_locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn save_exclusive(&self, record: &Registration) -> SaveOutcome {
        let link = match self.link.require().await {
            Ok(link) => link,
            Err(e) => {
                log::error!("Error saving user data: {}", e);
                return SaveOutcome::Failed;
            }
        };

        let target = match classify(&link) {
            Ok(target) => target,
            Err(e) => {
                log::error!("Error saving user data: {}", e);
                return SaveOutcome::Failed;
            }
        };

        match target {
            LinkTarget::Spreadsheet { .. } => self.save_to_sheet(&link, record).await,
            LinkTarget::File { url } => match self.files.save(&url, record).await {
                Ok(true) => SaveOutcome::Saved,
                Ok(false) => SaveOutcome::DuplicateWallet,
                Err(e) => {
                    log::error!("Error saving user data: {}", e);
                    SaveOutcome::Failed
                }
            },
        }
    }

    async fn save_to_sheet(&self, link: &str, record: &Registration) -> SaveOutcome {
        match self.gateway.append_if_absent(link, record).await {
            Ok(true) => SaveOutcome::Saved,
            Ok(false) => {
                log::error!("User wallet already exists: {}", record.user_wallet);
                SaveOutcome::DuplicateWallet
            }
            Err(e) => {
                log::error!("Error saving to Google Sheets: {}", e);
                SaveOutcome::Failed
            }
        }
    }

    /// Sets the status of the first row with this Telegram ID.
    ///
    /// Returns `false` when the ID is unknown or the sheet cannot be reached.
    pub async fn update_registration_status(&self, telegram_id: i64, status: Status) -> bool {
        let link = match self.link.require().await {
            Ok(link) => link,
            Err(e) => {
                log::error!("Error in update_registration_status: {}", e);
                return false;
            }
        };
        match self.gateway.update_status(&link, telegram_id, status).await {
            Ok(updated) => updated,
            Err(e) => {
                log::error!("Error in update_registration_status: {}", e);
                false
            }
        }
    }

    /// Registrations still waiting for approval.
    pub async fn list_pending(&self) -> Result<Vec<PendingEntry>, GatewayError> {
        let link = self.link.require().await?;
        self.gateway.list_pending(&link).await
    }
}
