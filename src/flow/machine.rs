//! Registration conversation
//!
//! One [`Session`] per chat lives in a concurrent map. Each inbound message
//! takes a snapshot of the session, runs one transition and writes the result
//! back, so no map guard is held across an `.await`. The dispatcher delivers
//! updates of one chat in order, which keeps the snapshot current.
//!
//! Regular users go `Start → LanguageSelect → Start → WalletType → UserWallet
//! → ReferrerWallet → End`. The administrator goes straight to `AdminMenu` and
//! may enter `ValidateUser` to approve a pending registration.

use std::sync::Arc;

use dashmap::DashMap;
use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use super::notifier::Notifier;
use super::session::{Session, State, WalletType};
use super::transport::{ChatTransport, Keyboard};
use crate::core::error::{AppError, AppResult};
use crate::core::validation::{is_valid_address, normalize_address_input, same_address};
use crate::i18n;
use crate::storage::{GatewayError, PendingEntry, Registration, RegistrationStore, SaveOutcome, Status};

/// Telegram rejects messages longer than 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;
/// Upper bound on remembered language choices awaiting approval
const MAX_REMEMBERED_LANGUAGES: usize = 10_000;

/// An inbound text message, stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
}

impl Inbound {
    pub fn new(chat_id: i64, user_id: i64, username: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            username: username.map(str::to_string),
            text: text.into(),
        }
    }
}

/// Drives the registration and admin conversations.
pub struct RegistrationFlow {
    store: Arc<RegistrationStore>,
    transport: Arc<dyn ChatTransport>,
    notifier: Notifier,
    admin_id: Option<i64>,
    admin_lang: LanguageIdentifier,
    sessions: DashMap<i64, Session>,
    /// Language picked by each user, kept until the approval notice is sent
    languages: DashMap<i64, LanguageIdentifier>,
}

impl RegistrationFlow {
    pub fn new(
        store: Arc<RegistrationStore>,
        transport: Arc<dyn ChatTransport>,
        admin_id: Option<i64>,
        admin_lang: LanguageIdentifier,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&transport), admin_id, admin_lang.clone());
        Self {
            store,
            transport,
            notifier,
            admin_id,
            admin_lang,
            sessions: DashMap::new(),
            languages: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<RegistrationStore> {
        &self.store
    }

    /// Current state of a chat; chats without a session are at `Start`.
    pub fn state_of(&self, chat_id: i64) -> State {
        self.sessions.get(&chat_id).map(|s| s.state).unwrap_or(State::Start)
    }

    /// Snapshot of a chat's session
    pub fn session(&self, chat_id: i64) -> Option<Session> {
        self.sessions.get(&chat_id).map(|s| s.clone())
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == Some(user_id)
    }

    fn snapshot(&self, chat_id: i64) -> Session {
        self.session(chat_id).unwrap_or_default()
    }

    fn store_session(&self, chat_id: i64, session: Session) {
        if session.state.is_terminal() {
            self.sessions.remove(&chat_id);
        } else {
            self.sessions.insert(chat_id, session);
        }
    }

    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        self.transport.send_text(chat_id, text, keyboard).await
    }

    fn admin_keyboard(&self) -> Keyboard {
        Keyboard::rows([
            [i18n::t(&self.admin_lang, "admin-list-users")],
            [i18n::t(&self.admin_lang, "admin-start-validation")],
        ])
    }

    // ==================== Entry points ====================

    /// `/start`: clears the session and re-enters `Start`.
    pub async fn on_start(&self, msg: &Inbound) {
        self.sessions.remove(&msg.chat_id);
        let result = self.enter_start(msg).await;
        self.finish(msg, Session::new(), result).await;
    }

    /// `/cancel`: clears the session and ends.
    pub async fn on_cancel(&self, msg: &Inbound) {
        let lang = match self.sessions.remove(&msg.chat_id) {
            Some((_, session)) if session.state.is_admin() => self.admin_lang.clone(),
            Some((_, session)) => session.lang(),
            None if self.is_admin(msg.user_id) => self.admin_lang.clone(),
            None => i18n::default_lang(),
        };
        log::info!("Conversation cancelled in chat {}", msg.chat_id);
        if let Err(e) = self
            .send(msg.chat_id, &i18n::t(&lang, "cancelled"), Some(Keyboard::Remove))
            .await
        {
            log::error!("Failed to send cancel confirmation: {}", e);
        }
    }

    /// Any non-command text.
    pub async fn on_text(&self, msg: &Inbound) {
        if msg.text.trim() == "/start" {
            return self.on_start(msg).await;
        }

        let session = self.snapshot(msg.chat_id);
        log::debug!("Chat {} in {:?} received text", msg.chat_id, session.state);

        let result = match session.state {
            State::Start if session.has_language() => self.begin_registration(msg, session.clone()).await,
            State::Start | State::End => self.enter_start(msg).await,
            State::LanguageSelect => self.select_language(msg, session.clone()).await,
            State::WalletType => self.select_wallet_type(msg, session.clone()).await,
            State::UserWallet => self.collect_user_wallet(msg, session.clone()).await,
            State::ReferrerWallet => self.collect_referrer_wallet(msg, session.clone()).await,
            State::AdminMenu => self.admin_menu(msg, session.clone()).await,
            State::ValidateUser => self.confirm_user(msg, session.clone()).await,
        };
        self.finish(msg, session, result).await;
    }

    /// Stores the next session, or runs the error boundary on failure.
    async fn finish(&self, msg: &Inbound, previous: Session, result: AppResult<Session>) {
        match result {
            Ok(next) => self.store_session(msg.chat_id, next),
            Err(e) => {
                log::error!("Error in {:?} for chat {}: {}", previous.state, msg.chat_id, e);
                let (key, lang, next, keyboard) = if self.is_admin(msg.user_id) && self.store.is_configured().await {
                    (
                        "admin-error",
                        self.admin_lang.clone(),
                        Session::new().with_state(State::AdminMenu),
                        Some(self.admin_keyboard()),
                    )
                } else {
                    (
                        "error-try-again",
                        previous.lang(),
                        Session::new().with_state(State::End),
                        Some(Keyboard::Remove),
                    )
                };
                self.store_session(msg.chat_id, next);
                if let Err(e) = self.send(msg.chat_id, &i18n::t(&lang, key), keyboard).await {
                    log::error!("Failed to report error to chat {}: {}", msg.chat_id, e);
                }
            }
        }
    }

    // ==================== Registration path ====================

    async fn enter_start(&self, msg: &Inbound) -> AppResult<Session> {
        let configured = self.store.is_configured().await;

        if self.is_admin(msg.user_id) {
            if !configured {
                self.send(msg.chat_id, &i18n::t(&self.admin_lang, "admin-setup"), None)
                    .await?;
                return Ok(Session::new().with_state(State::End));
            }
            self.send(
                msg.chat_id,
                &i18n::t(&self.admin_lang, "admin-menu"),
                Some(self.admin_keyboard()),
            )
            .await?;
            return Ok(Session::new().with_state(State::AdminMenu));
        }

        if !configured {
            log::warn!("Registration attempt from {} before a link was set", msg.user_id);
            self.send(msg.chat_id, &i18n::t(&i18n::default_lang(), "not-configured"), None)
                .await?;
            return Ok(Session::new().with_state(State::End));
        }

        self.send(
            msg.chat_id,
            &i18n::t(&i18n::default_lang(), "choose-language"),
            Some(Keyboard::rows(i18n::language_keyboard_rows())),
        )
        .await?;
        Ok(Session::new().with_state(State::LanguageSelect))
    }

    async fn select_language(&self, msg: &Inbound, mut session: Session) -> AppResult<Session> {
        let Some(lang) = i18n::language_from_button(&msg.text) else {
            self.send(msg.chat_id, &i18n::t(&session.lang(), "language-reprompt"), None)
                .await?;
            return Ok(session);
        };

        if self.languages.len() < MAX_REMEMBERED_LANGUAGES || self.languages.contains_key(&msg.user_id) {
            self.languages.insert(msg.user_id, lang.clone());
        } else {
            log::warn!("Language memory full, approval notice to {} will use the default", msg.user_id);
        }
        session.language = Some(lang.clone());
        self.send(
            msg.chat_id,
            &i18n::t(&lang, "welcome"),
            Some(Keyboard::one_time_button(i18n::t(&lang, "start-button"))),
        )
        .await?;
        Ok(session.with_state(State::Start))
    }

    async fn begin_registration(&self, msg: &Inbound, session: Session) -> AppResult<Session> {
        let lang = session.lang();
        self.notifier.new_session(msg.username.as_deref());
        self.send(
            msg.chat_id,
            &i18n::t(&lang, "select-wallet"),
            Some(Keyboard::rows([[i18n::t(&lang, "evm-wallet")]])),
        )
        .await?;
        Ok(session.with_state(State::WalletType))
    }

    async fn select_wallet_type(&self, msg: &Inbound, mut session: Session) -> AppResult<Session> {
        let lang = session.lang();
        if msg.text.trim() != i18n::t(&lang, "evm-wallet") {
            self.send(msg.chat_id, &i18n::t(&lang, "select-wallet-error"), None)
                .await?;
            return Ok(session);
        }

        session.wallet_type = Some(WalletType::Evm);
        self.send(msg.chat_id, &i18n::t(&lang, "enter-wallet"), Some(Keyboard::Remove))
            .await?;
        Ok(session.with_state(State::UserWallet))
    }

    async fn collect_user_wallet(&self, msg: &Inbound, mut session: Session) -> AppResult<Session> {
        let lang = session.lang();
        let wallet = normalize_address_input(&msg.text);
        if !is_valid_address(&wallet) {
            self.send(msg.chat_id, &i18n::t(&lang, "invalid-wallet"), None).await?;
            return Ok(session);
        }

        session.user_wallet = Some(wallet);
        self.send(msg.chat_id, &i18n::t(&lang, "enter-referral"), None).await?;
        Ok(session.with_state(State::ReferrerWallet))
    }

    async fn collect_referrer_wallet(&self, msg: &Inbound, mut session: Session) -> AppResult<Session> {
        let lang = session.lang();
        let referrer = normalize_address_input(&msg.text);
        if !is_valid_address(&referrer) {
            self.send(msg.chat_id, &i18n::t(&lang, "invalid-ref"), None).await?;
            return Ok(session);
        }

        let user_wallet = session
            .user_wallet
            .clone()
            .ok_or_else(|| AppError::Anyhow(anyhow::anyhow!("session has no user wallet")))?;
        if same_address(&referrer, &user_wallet) {
            self.send(msg.chat_id, &i18n::t(&lang, "same-wallet"), None).await?;
            return Ok(session);
        }
        session.referrer_wallet = Some(referrer.clone());

        let record = Registration::pending(msg.user_id, msg.username.clone(), &user_wallet, &referrer);
        let outcome = self.store.save_registration(&record).await;
        log::info!("Registration of {} for user {}: {:?}", user_wallet, msg.user_id, outcome);

        let key = match outcome {
            SaveOutcome::Saved => "registration-success",
            SaveOutcome::DuplicateWallet => "wallet-exists",
            SaveOutcome::Failed => "error-save",
        };
        self.send(msg.chat_id, &i18n::t(&lang, key), Some(Keyboard::Remove))
            .await?;
        if outcome.is_saved() {
            self.notifier.new_registration(&record);
        }
        Ok(session.with_state(State::End))
    }

    // ==================== Administrator path ====================

    async fn admin_menu(&self, msg: &Inbound, session: Session) -> AppResult<Session> {
        let text = msg.text.trim();
        if text == i18n::t(&self.admin_lang, "admin-list-users") {
            self.show_pending(msg.chat_id).await?;
            return Ok(session.with_state(State::AdminMenu));
        }
        if text == i18n::t(&self.admin_lang, "admin-start-validation") {
            if self.show_pending(msg.chat_id).await? {
                self.send(msg.chat_id, &i18n::t(&self.admin_lang, "admin-enter-id"), None)
                    .await?;
                return Ok(session.with_state(State::ValidateUser));
            }
            return Ok(session.with_state(State::AdminMenu));
        }

        self.send(
            msg.chat_id,
            &i18n::t(&self.admin_lang, "admin-menu"),
            Some(self.admin_keyboard()),
        )
        .await?;
        Ok(session)
    }

    /// Sends the pending list. Returns `true` when at least one entry was shown.
    async fn show_pending(&self, chat_id: i64) -> AppResult<bool> {
        let key = match self.store.list_pending().await {
            Ok(entries) if !entries.is_empty() => {
                for chunk in self.format_pending(&entries) {
                    self.send(chat_id, &chunk, None).await?;
                }
                return Ok(true);
            }
            Ok(_) => "admin-no-pending",
            Err(GatewayError::LinkNotConfigured) => "admin-not-configured",
            Err(GatewayError::EmptySheet) => "admin-sheet-empty",
            Err(e) => {
                log::error!("Error listing pending registrations: {}", e);
                "admin-read-error"
            }
        };
        self.send(chat_id, &i18n::t(&self.admin_lang, key), None).await?;
        Ok(false)
    }

    /// Pending entries as one or more messages within Telegram's size limit.
    fn format_pending(&self, entries: &[PendingEntry]) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = i18n::t(&self.admin_lang, "admin-pending-header");

        for entry in entries {
            let mut args = FluentArgs::new();
            let username = if entry.username.trim().is_empty() {
                i18n::t(&self.admin_lang, "admin-no-username")
            } else {
                entry.username.trim_start_matches('@').to_string()
            };
            args.set("username", username);
            args.set("id", entry.telegram_id.clone());
            args.set("wallet", entry.user_wallet.clone());
            let block = i18n::t_args(&self.admin_lang, "admin-pending-entry", &args);

            if current.chars().count() + block.chars().count() + 2 > MAX_MESSAGE_CHARS {
                messages.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&block);
        }
        messages.push(current);
        messages
    }

    async fn confirm_user(&self, msg: &Inbound, session: Session) -> AppResult<Session> {
        let Ok(telegram_id) = msg.text.trim().parse::<i64>() else {
            self.send(msg.chat_id, &i18n::t(&self.admin_lang, "admin-invalid-id"), None)
                .await?;
            return Ok(session);
        };

        let text = if self
            .store
            .update_registration_status(telegram_id, Status::Confirmed)
            .await
        {
            log::info!("✅ Registration of {} confirmed", telegram_id);
            let lang = self
                .languages
                .remove(&telegram_id)
                .map(|(_, lang)| lang)
                .unwrap_or_else(i18n::default_lang);
            let mut args = FluentArgs::new();
            args.set("id", telegram_id.to_string());
            let key = if self.notifier.notify_registrant(telegram_id, &lang).await {
                "admin-user-confirmed"
            } else {
                "admin-confirmed-notify-failed"
            };
            i18n::t_args(&self.admin_lang, key, &args)
        } else {
            i18n::t(&self.admin_lang, "admin-user-not-found")
        };

        self.send(msg.chat_id, &text, Some(self.admin_keyboard())).await?;
        Ok(session.with_state(State::AdminMenu))
    }

    // ==================== Link commands ====================

    /// `/setlink <url>`, administrator only.
    pub async fn on_set_link(&self, msg: &Inbound, link: &str) {
        if !self.is_admin(msg.user_id) {
            log::warn!("Ignoring /setlink from non-admin {}", msg.user_id);
            return;
        }

        let link = link.trim();
        let text = if link.is_empty() {
            i18n::t(&self.admin_lang, "setlink-usage")
        } else {
            match self.store.link().set(link).await {
                Ok(()) => {
                    log::info!("🔗 Spreadsheet link set to {}", link);
                    i18n::t(&self.admin_lang, "setlink-saved")
                }
                Err(e) => {
                    log::error!("Failed to save spreadsheet link: {}", e);
                    let mut args = FluentArgs::new();
                    args.set("error", e.to_string());
                    i18n::t_args(&self.admin_lang, "setlink-failed", &args)
                }
            }
        };

        if let Err(e) = self.send(msg.chat_id, &text, None).await {
            log::error!("Failed to answer /setlink: {}", e);
        }
    }

    /// `/getlink`, administrator only.
    pub async fn on_get_link(&self, msg: &Inbound) {
        if !self.is_admin(msg.user_id) {
            log::warn!("Ignoring /getlink from non-admin {}", msg.user_id);
            return;
        }

        let text = match self.store.link().get().await {
            Some(link) => {
                let mut args = FluentArgs::new();
                args.set("link", link);
                i18n::t_args(&self.admin_lang, "getlink-current", &args)
            }
            None => i18n::t(&self.admin_lang, "getlink-missing"),
        };

        if let Err(e) = self.send(msg.chat_id, &text, None).await {
            log::error!("Failed to answer /getlink: {}", e);
        }
    }
}

impl std::fmt::Debug for RegistrationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationFlow")
            .field("admin_id", &self.admin_id)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::lang_from_code;
    use crate::storage::{FileTarget, LinkStore, SheetBackend, SheetContext, SheetGateway};
    use crate::testing::{MemorySheet, RecordingTransport};
    use std::time::Duration;

    const ADMIN: i64 = 1000;

    async fn flow_without_link() -> (RegistrationFlow, Arc<RecordingTransport>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let links = Arc::new(LinkStore::open(dir.path().join("link.txt")).await);
        let sheet: Arc<dyn SheetBackend> = Arc::new(MemorySheet::new());
        let gateway = SheetGateway::new(vec![SheetContext::new("primary", sheet)], Duration::from_secs(1));
        let store = Arc::new(RegistrationStore::new(links, gateway, FileTarget::new().unwrap()));
        let transport = Arc::new(RecordingTransport::new());
        let flow = RegistrationFlow::new(store, transport.clone(), Some(ADMIN), lang_from_code("en"));
        (flow, transport, dir)
    }

    #[tokio::test]
    async fn test_user_without_link_is_turned_away() {
        let (flow, transport, _dir) = flow_without_link().await;

        flow.on_start(&Inbound::new(5, 5, Some("eve"), "/start")).await;
        assert_eq!(flow.state_of(5), State::Start);
        assert!(flow.session(5).is_none());
        assert!(transport.last_to(5).unwrap().text.contains("being set up"));
    }

    #[tokio::test]
    async fn test_admin_without_link_gets_setup_help() {
        let (flow, transport, _dir) = flow_without_link().await;

        flow.on_start(&Inbound::new(ADMIN, ADMIN, None, "/start")).await;
        assert!(flow.session(ADMIN).is_none());
        assert!(transport.last_to(ADMIN).unwrap().text.contains("/setlink"));
    }

    #[tokio::test]
    async fn test_link_commands_are_admin_only() {
        let (flow, transport, _dir) = flow_without_link().await;

        flow.on_set_link(&Inbound::new(5, 5, None, "/setlink x"), "https://example.com/a.xlsx")
            .await;
        flow.on_get_link(&Inbound::new(5, 5, None, "/getlink")).await;
        assert!(transport.sent().is_empty());
        assert!(!flow.store().is_configured().await);

        let admin = Inbound::new(ADMIN, ADMIN, None, "/getlink");
        flow.on_get_link(&admin).await;
        assert!(transport.last_to(ADMIN).unwrap().text.contains("not set yet"));

        flow.on_set_link(&admin, "   ").await;
        assert!(transport.last_to(ADMIN).unwrap().text.contains("Usage"));

        flow.on_set_link(&admin, " https://example.com/a.xlsx ").await;
        assert!(transport.last_to(ADMIN).unwrap().text.contains("Link saved"));
        flow.on_get_link(&admin).await;
        assert!(transport
            .last_to(ADMIN)
            .unwrap()
            .text
            .contains("https://example.com/a.xlsx"));
    }

    #[tokio::test]
    async fn test_send_failure_ends_conversation() {
        let (flow, transport, _dir) = flow_without_link().await;
        flow.store().link().set("https://docs.google.com/spreadsheets/d/x/edit").await.unwrap();
        transport.mark_unreachable(5);

        flow.on_start(&Inbound::new(5, 5, None, "/start")).await;
        assert!(flow.session(5).is_none());
    }

    #[tokio::test]
    async fn test_approval_forgets_language() {
        let (flow, transport, _dir) = flow_without_link().await;
        flow.store().link().set("https://docs.google.com/spreadsheets/d/x/edit").await.unwrap();

        flow.on_start(&Inbound::new(5, 5, Some("eve"), "/start")).await;
        flow.on_text(&Inbound::new(5, 5, Some("eve"), "Русский 🇷🇺")).await;
        assert!(flow.languages.contains_key(&5));
        let record = Registration::pending(
            5,
            None,
            "0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1",
            "0x00000000000000000000000000000000000000aa",
        );
        assert!(flow.store().save_registration(&record).await.is_saved());

        flow.on_start(&Inbound::new(ADMIN, ADMIN, None, "/start")).await;
        flow.on_text(&Inbound::new(ADMIN, ADMIN, None, "Start validation")).await;
        flow.on_text(&Inbound::new(ADMIN, ADMIN, None, "5")).await;

        assert!(transport.last_to(5).unwrap().text.contains("Поздравляем"));
        assert!(!flow.languages.contains_key(&5));
    }

    #[tokio::test]
    async fn test_format_pending_splits_long_lists() {
        let (flow, _transport, _dir) = flow_without_link().await;
        let entries: Vec<PendingEntry> = (0..200)
            .map(|i| PendingEntry {
                telegram_id: i.to_string(),
                username: String::new(),
                user_wallet: format!("0x{:040x}", i),
            })
            .collect();

        let messages = flow.format_pending(&entries);
        assert!(messages.len() > 1);
        assert!(messages.iter().all(|m| m.chars().count() <= MAX_MESSAGE_CHARS));
        let total: usize = messages.iter().map(|m| m.matches("📱 ID:").count()).sum();
        assert_eq!(total, 200);
    }
}
