//! Per-chat conversation state

use unic_langid::LanguageIdentifier;

use crate::i18n;

/// Where a chat is in the conversation.
///
/// `Start` covers both the fresh entry point and the step right after a
/// language was picked; the two are told apart by `Session::language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    LanguageSelect,
    WalletType,
    UserWallet,
    ReferrerWallet,
    AdminMenu,
    ValidateUser,
    End,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::End)
    }

    /// States only the administrator can be in
    pub fn is_admin(&self) -> bool {
        matches!(self, State::AdminMenu | State::ValidateUser)
    }
}

/// Wallet kinds offered by the picker. Only EVM addresses are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    Evm,
}

/// Ephemeral per-chat data, discarded at `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: State,
    pub language: Option<LanguageIdentifier>,
    pub wallet_type: Option<WalletType>,
    pub user_wallet: Option<String>,
    pub referrer_wallet: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            language: None,
            wallet_type: None,
            user_wallet: None,
            referrer_wallet: None,
        }
    }

    /// Session language, or the base language before one was picked
    pub fn lang(&self) -> LanguageIdentifier {
        self.language.clone().unwrap_or_else(i18n::default_lang)
    }

    /// True after the language picker, while still in `Start`.
    pub fn has_language(&self) -> bool {
        self.language.is_some()
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }
}
