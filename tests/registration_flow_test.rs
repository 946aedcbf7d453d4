//! End-to-end tests of the user registration conversation

mod common;

use common::{TestEnvironment, ADMIN, REFERRER, USER_WALLET};
use pretty_assertions::assert_eq;
use walletlist::flow::{Keyboard, State};
use walletlist::storage::HEADER;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_successful_registration_appends_row_and_alerts_admin() {
    let env = TestEnvironment::new().await;

    env.register(42, USER_WALLET, REFERRER).await;

    assert_eq!(
        env.primary.rows(),
        vec![row(&HEADER), row(&["42", "user42", USER_WALLET, REFERRER, ""])]
    );
    let reply = env.transport.last_to(42).unwrap();
    assert!(reply.text.contains("Thank you for registering"));
    assert_eq!(reply.keyboard, Some(Keyboard::Remove));
    assert_eq!(env.flow.state_of(42), State::Start);
    assert!(env.flow.session(42).is_none());

    let alert = env.wait_for_message(ADMIN, "New registration").await.unwrap();
    assert!(alert.text.contains(USER_WALLET));
    assert!(alert.text.contains(REFERRER));
    assert!(alert.text.contains("@user42"));
}

#[tokio::test]
async fn test_uppercase_duplicate_is_rejected() {
    let env = TestEnvironment::new().await;
    env.register(7, &USER_WALLET.to_lowercase(), REFERRER).await;
    let rows_before = env.primary.rows();

    env.reach_referrer_step(8, "English 🇬🇧", "0X1AD2B053B8C6B1592CB645DEFADF105F34D8C6E1")
        .await;
    env.say(8, "0x00000000000000000000000000000000000000bb").await;

    assert!(env.last_text(8).contains("already registered"));
    assert_eq!(env.primary.rows(), rows_before);
    assert!(env.flow.session(8).is_none());
}

#[tokio::test]
async fn test_invalid_wallet_reprompts() {
    let env = TestEnvironment::new().await;
    env.start(5).await;
    env.say(5, "English 🇬🇧").await;
    env.say(5, "Start").await;
    env.say(5, "EVM Wallet").await;

    for bad in ["0x123", "1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1aa", "0xZZD2B053b8c6b1592cB645DEfadf105F34d8C6e1"] {
        env.say(5, bad).await;
        assert_eq!(env.flow.state_of(5), State::UserWallet);
        assert!(env.last_text(5).contains("Invalid address format"));
    }
    assert!(env.primary.rows().is_empty());
}

#[tokio::test]
async fn test_referrer_equal_to_own_wallet_is_rejected() {
    let env = TestEnvironment::new().await;
    env.reach_referrer_step(5, "English 🇬🇧", USER_WALLET).await;

    env.say(5, &USER_WALLET.to_lowercase()).await;
    assert_eq!(env.flow.state_of(5), State::ReferrerWallet);
    assert!(env.last_text(5).contains("cannot be the same"));

    env.say(5, "not a wallet").await;
    assert_eq!(env.flow.state_of(5), State::ReferrerWallet);
    assert!(env.last_text(5).contains("Invalid address format"));
    assert!(env.primary.rows().is_empty());

    env.say(5, REFERRER).await;
    assert_eq!(env.primary.rows().len(), 2);
}

#[tokio::test]
async fn test_referrer_may_be_another_registrants_wallet() {
    let env = TestEnvironment::new().await;
    env.register(1, REFERRER, USER_WALLET).await;
    env.register(2, USER_WALLET, REFERRER).await;

    assert_eq!(env.primary.rows().len(), 3);
    assert!(env.last_text(2).contains("Thank you for registering"));
}

#[tokio::test]
async fn test_language_picker_reprompts_on_unknown_label() {
    let env = TestEnvironment::new().await;
    env.start(5).await;

    let picker = env.transport.last_to(5).unwrap();
    assert_eq!(picker.keyboard.unwrap().labels().len(), 6);
    assert_eq!(env.flow.state_of(5), State::LanguageSelect);

    env.say(5, "Deutsch").await;
    assert_eq!(env.flow.state_of(5), State::LanguageSelect);
    assert!(env.last_text(5).contains("select a language"));
}

#[tokio::test]
async fn test_wallet_type_must_be_the_button() {
    let env = TestEnvironment::new().await;
    env.start(5).await;
    env.say(5, "English 🇬🇧").await;
    env.say(5, "Start").await;
    assert_eq!(env.flow.state_of(5), State::WalletType);

    env.say(5, "Bitcoin").await;
    assert_eq!(env.flow.state_of(5), State::WalletType);
    assert!(env.last_text(5).contains("select a wallet type"));
}

#[tokio::test]
async fn test_russian_conversation_uses_localized_labels() {
    let env = TestEnvironment::new().await;
    env.start(5).await;
    env.say(5, "Русский 🇷🇺").await;

    let welcome = env.transport.last_to(5).unwrap();
    assert!(welcome.text.contains("Привет"));
    assert_eq!(welcome.keyboard.unwrap().labels(), vec!["Начать"]);

    env.say(5, "Начать").await;
    env.say(5, "EVM Wallet").await;
    assert_eq!(env.flow.state_of(5), State::WalletType);
    env.say(5, "EVM Кошелек").await;
    assert_eq!(env.flow.state_of(5), State::UserWallet);
    assert!(env.last_text(5).contains("Введите адрес"));
}

#[tokio::test]
async fn test_new_session_alert_reaches_admin() {
    let env = TestEnvironment::new().await;
    env.start(5).await;
    env.say(5, "English 🇬🇧").await;
    env.say(5, "Start").await;

    let alert = env.wait_for_message(ADMIN, "started registration").await.unwrap();
    assert!(alert.text.contains("@user5"));
}

#[tokio::test]
async fn test_cancel_clears_session() {
    let env = TestEnvironment::new().await;
    env.reach_referrer_step(5, "English 🇬🇧", USER_WALLET).await;

    env.flow.on_cancel(&TestEnvironment::message(5, "/cancel")).await;
    assert!(env.flow.session(5).is_none());
    let reply = env.transport.last_to(5).unwrap();
    assert_eq!(reply.text, "Operation cancelled.");
    assert_eq!(reply.keyboard, Some(Keyboard::Remove));
    assert!(env.primary.rows().is_empty());
}

#[tokio::test]
async fn test_start_at_referrer_step_restarts() {
    let env = TestEnvironment::new().await;
    env.reach_referrer_step(5, "English 🇬🇧", USER_WALLET).await;

    env.say(5, "/start").await;
    assert_eq!(env.flow.state_of(5), State::LanguageSelect);
    let session = env.flow.session(5).unwrap();
    assert_eq!(session.user_wallet, None);
    assert_eq!(session.language, None);
}

#[tokio::test]
async fn test_registration_closed_until_link_is_set() {
    let env = TestEnvironment::unconfigured().await;
    env.start(5).await;

    assert!(env.last_text(5).contains("being set up"));
    assert!(env.flow.session(5).is_none());
}

#[tokio::test]
async fn test_unreachable_sheet_reports_generic_error() {
    let env = TestEnvironment::new().await;
    env.reach_referrer_step(5, "English 🇬🇧", USER_WALLET).await;
    env.primary.set_failing(true);
    env.secondary.set_failing(true);

    env.say(5, REFERRER).await;
    assert!(env.last_text(5).contains("error occurred while saving"));
    assert!(env.flow.session(5).is_none());
}

#[tokio::test]
async fn test_chats_progress_independently() {
    let env = TestEnvironment::new().await;
    env.start(5).await;
    env.start(6).await;
    env.say(5, "English 🇬🇧").await;

    assert_eq!(env.flow.state_of(5), State::Start);
    assert!(env.flow.session(5).unwrap().has_language());
    assert_eq!(env.flow.state_of(6), State::LanguageSelect);
}
