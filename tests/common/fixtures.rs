//! A conversation wired to in-memory sheets and a recording transport

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use walletlist::flow::{Inbound, RegistrationFlow, State};
use walletlist::i18n;
use walletlist::storage::{FileTarget, LinkStore, RegistrationStore, SheetBackend, SheetContext, SheetGateway};
use walletlist::testing::{MemorySheet, RecordingTransport, SentMessage};

pub const ADMIN: i64 = 1000;
pub const USER_WALLET: &str = "0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1";
pub const REFERRER: &str = "0x00000000000000000000000000000000000000aa";
pub const SHEET_LINK: &str = "https://docs.google.com/spreadsheets/d/test-sheet/edit#gid=0";

pub struct TestEnvironment {
    pub flow: RegistrationFlow,
    pub transport: Arc<RecordingTransport>,
    pub primary: Arc<MemorySheet>,
    pub secondary: Arc<MemorySheet>,
    _dir: TempDir,
}

#[allow(dead_code)]
impl TestEnvironment {
    /// Environment with the spreadsheet link already set
    pub async fn new() -> Self {
        let env = Self::unconfigured().await;
        env.flow
            .store()
            .link()
            .set(SHEET_LINK)
            .await
            .expect("Failed to write link file");
        env
    }

    /// Environment where no administrator has run /setlink yet
    pub async fn unconfigured() -> Self {
        Self::with_sheets(Arc::new(MemorySheet::new()), Arc::new(MemorySheet::new())).await
    }

    pub async fn with_sheets(primary: Arc<MemorySheet>, secondary: Arc<MemorySheet>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let links = Arc::new(LinkStore::open(dir.path().join("data").join("sheet_link.txt")).await);
        let gateway = SheetGateway::new(
            vec![
                SheetContext::new("primary", primary.clone() as Arc<dyn SheetBackend>),
                SheetContext::new("secondary", secondary.clone() as Arc<dyn SheetBackend>),
            ],
            Duration::from_secs(1),
        );
        let store = Arc::new(RegistrationStore::new(
            links,
            gateway,
            FileTarget::new().expect("Failed to build HTTP client"),
        ));
        let transport = Arc::new(RecordingTransport::new());
        let flow = RegistrationFlow::new(store, transport.clone(), Some(ADMIN), i18n::lang_from_code("en"));
        Self {
            flow,
            transport,
            primary,
            secondary,
            _dir: dir,
        }
    }

    pub fn message(user_id: i64, text: &str) -> Inbound {
        let username = format!("user{}", user_id);
        Inbound::new(user_id, user_id, Some(username.as_str()), text)
    }

    /// `/start` from a private chat
    pub async fn start(&self, user_id: i64) {
        self.flow.on_start(&Self::message(user_id, "/start")).await;
    }

    /// Plain text from a private chat
    pub async fn say(&self, user_id: i64, text: &str) {
        self.flow.on_text(&Self::message(user_id, text)).await;
    }

    /// Walks a user from `/start` up to the referrer prompt.
    pub async fn reach_referrer_step(&self, user_id: i64, language_button: &str, wallet: &str) {
        self.start(user_id).await;
        self.say(user_id, language_button).await;
        let lang = i18n::language_from_button(language_button).expect("unknown language button");
        self.say(user_id, &i18n::t(&lang, "start-button")).await;
        self.say(user_id, &i18n::t(&lang, "evm-wallet")).await;
        self.say(user_id, wallet).await;
        assert_eq!(self.flow.state_of(user_id), State::ReferrerWallet);
        self.settle().await;
    }

    /// Full English registration
    pub async fn register(&self, user_id: i64, wallet: &str, referrer: &str) {
        self.reach_referrer_step(user_id, "English 🇬🇧", wallet).await;
        self.say(user_id, referrer).await;
        self.settle().await;
    }

    /// Lets spawned admin alerts land before the next assertion.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub fn last_text(&self, chat_id: i64) -> String {
        self.transport
            .last_to(chat_id)
            .map(|m| m.text)
            .unwrap_or_default()
    }

    /// Waits for a spawned notification containing `needle`.
    pub async fn wait_for_message(&self, chat_id: i64, needle: &str) -> Option<SentMessage> {
        for _ in 0..100 {
            if let Some(found) = self
                .transport
                .sent_to(chat_id)
                .into_iter()
                .find(|m| m.text.contains(needle))
            {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}
