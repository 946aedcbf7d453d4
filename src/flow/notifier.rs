//! Out-of-band messages: admin alerts and the approval notice
//!
//! Admin alerts are spawned and never awaited by the conversation. Each send is
//! bounded by `config::notify::timeout()`.

use std::sync::Arc;
use std::time::Duration;

use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use super::transport::ChatTransport;
use crate::core::config;
use crate::i18n;
use crate::storage::Registration;

/// Sends best-effort notifications through a [`ChatTransport`].
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn ChatTransport>,
    admin_id: Option<i64>,
    admin_lang: LanguageIdentifier,
    timeout: Duration,
}

impl Notifier {
    pub fn new(transport: Arc<dyn ChatTransport>, admin_id: Option<i64>, admin_lang: LanguageIdentifier) -> Self {
        Self {
            transport,
            admin_id,
            admin_lang,
            timeout: config::notify::timeout(),
        }
    }

    fn username_or_placeholder(&self, username: Option<&str>) -> String {
        match username {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => i18n::t(&self.admin_lang, "admin-no-username"),
        }
    }

    /// Fire-and-forget message to the administrator.
    fn alert_admin(&self, text: String) {
        let Some(admin_id) = self.admin_id else {
            log::debug!("No ADMIN_ID configured, skipping admin alert");
            return;
        };
        let transport = Arc::clone(&self.transport);
        let timeout = self.timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, transport.send_text(admin_id, &text, None)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Failed to notify admin: {}", e),
                Err(_) => log::error!("Failed to notify admin: timed out after {:?}", timeout),
            }
        });
    }

    /// A user pressed "Start" after picking a language.
    pub fn new_session(&self, username: Option<&str>) {
        let mut args = FluentArgs::new();
        args.set("username", self.username_or_placeholder(username));
        self.alert_admin(i18n::t_args(&self.admin_lang, "admin-new-session", &args));
    }

    /// A registration was saved.
    pub fn new_registration(&self, record: &Registration) {
        let mut args = FluentArgs::new();
        args.set("username", self.username_or_placeholder(record.username.as_deref()));
        args.set("id", record.telegram_id.to_string());
        args.set("wallet", record.user_wallet.clone());
        args.set("referrer", record.referrer_wallet.clone());
        self.alert_admin(i18n::t_args(&self.admin_lang, "admin-new-registration", &args));
    }

    /// Tells an approved registrant. Returns whether the message was delivered.
    pub async fn notify_registrant(&self, telegram_id: i64, lang: &LanguageIdentifier) -> bool {
        let text = i18n::t(lang, "approval-notice");
        match tokio::time::timeout(self.timeout, self.transport.send_text(telegram_id, &text, None)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::warn!("Approval notice to {} not delivered: {}", telegram_id, e);
                false
            }
            Err(_) => {
                log::warn!("Approval notice to {} timed out", telegram_id);
                false
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("admin_id", &self.admin_id)
            .field("admin_lang", &self.admin_lang)
            .field("timeout", &self.timeout)
            .finish()
    }
}
