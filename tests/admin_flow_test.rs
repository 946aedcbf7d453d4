//! End-to-end tests of the administrator menu and link commands

mod common;

use common::{TestEnvironment, ADMIN, REFERRER, SHEET_LINK, USER_WALLET};
use pretty_assertions::assert_eq;
use walletlist::flow::State;

async fn open_admin_menu(env: &TestEnvironment) {
    env.start(ADMIN).await;
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
}

#[tokio::test]
async fn test_admin_start_opens_menu() {
    let env = TestEnvironment::new().await;
    open_admin_menu(&env).await;

    let menu = env.transport.last_to(ADMIN).unwrap();
    assert!(menu.text.contains("Admin panel"));
    assert_eq!(menu.keyboard.unwrap().labels(), vec!["List users", "Start validation"]);
}

#[tokio::test]
async fn test_approve_pending_registration() {
    let env = TestEnvironment::new().await;
    env.register(42, USER_WALLET, REFERRER).await;
    open_admin_menu(&env).await;

    env.say(ADMIN, "Start validation").await;
    assert_eq!(env.flow.state_of(ADMIN), State::ValidateUser);
    let sent = env.transport.sent_to(ADMIN);
    assert!(sent.iter().any(|m| m.text.contains(USER_WALLET) && m.text.contains("ID: 42")));
    assert!(env.last_text(ADMIN).contains("Enter the ID"));

    env.say(ADMIN, "forty-two").await;
    assert_eq!(env.flow.state_of(ADMIN), State::ValidateUser);
    assert!(env.last_text(ADMIN).contains("valid Telegram ID"));
    assert_eq!(env.primary.rows()[1][4], "");

    env.say(ADMIN, " 42 ").await;
    assert_eq!(env.primary.rows()[1][4], "Confirmed");
    assert!(env.last_text(42).contains("Congratulations"));
    assert!(env.last_text(ADMIN).contains("User 42 has been confirmed"));
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
}

#[tokio::test]
async fn test_approval_notice_uses_registrant_language() {
    let env = TestEnvironment::new().await;
    env.reach_referrer_step(42, "Русский 🇷🇺", USER_WALLET).await;
    env.say(42, REFERRER).await;
    open_admin_menu(&env).await;

    env.say(ADMIN, "Start validation").await;
    env.say(ADMIN, "42").await;
    assert!(env.last_text(42).contains("Поздравляем"));
}

#[tokio::test]
async fn test_unknown_id_is_reported() {
    let env = TestEnvironment::new().await;
    env.register(42, USER_WALLET, REFERRER).await;
    open_admin_menu(&env).await;
    env.say(ADMIN, "Start validation").await;
    let rows_before = env.primary.rows();

    env.say(ADMIN, "99").await;
    assert!(env.last_text(ADMIN).contains("Could not find"));
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
    assert_eq!(env.primary.rows(), rows_before);
    assert!(env.transport.sent_to(99).is_empty());
}

#[tokio::test]
async fn test_undeliverable_approval_is_reported() {
    let env = TestEnvironment::new().await;
    env.register(42, USER_WALLET, REFERRER).await;
    env.transport.mark_unreachable(42);
    open_admin_menu(&env).await;

    env.say(ADMIN, "Start validation").await;
    env.say(ADMIN, "42").await;
    assert_eq!(env.primary.rows()[1][4], "Confirmed");
    assert!(env.last_text(ADMIN).contains("could not be delivered"));
}

#[tokio::test]
async fn test_validation_with_nothing_pending_stays_in_menu() {
    let env = TestEnvironment::new().await;
    env.register(42, USER_WALLET, REFERRER).await;
    open_admin_menu(&env).await;
    env.say(ADMIN, "Start validation").await;
    env.say(ADMIN, "42").await;

    env.say(ADMIN, "Start validation").await;
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
    assert!(env.last_text(ADMIN).contains("No registrations are waiting"));
}

#[tokio::test]
async fn test_list_users_on_empty_sheet() {
    let env = TestEnvironment::new().await;
    open_admin_menu(&env).await;

    env.say(ADMIN, "List users").await;
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
    assert!(env.last_text(ADMIN).contains("no registrations yet"));
}

#[tokio::test]
async fn test_list_users_when_sheet_unreachable() {
    let env = TestEnvironment::new().await;
    open_admin_menu(&env).await;
    env.primary.set_failing(true);
    env.secondary.set_failing(true);

    env.say(ADMIN, "Start validation").await;
    assert_eq!(env.flow.state_of(ADMIN), State::AdminMenu);
    assert!(env.last_text(ADMIN).contains("error occurred while reading"));
}

#[tokio::test]
async fn test_setup_then_setlink_then_menu() {
    let env = TestEnvironment::unconfigured().await;
    env.start(ADMIN).await;
    assert!(env.last_text(ADMIN).contains("/setlink"));
    assert!(env.flow.session(ADMIN).is_none());

    let admin = TestEnvironment::message(ADMIN, "/setlink");
    env.flow.on_set_link(&admin, SHEET_LINK).await;
    assert!(env.last_text(ADMIN).contains("Link saved"));

    env.flow.on_get_link(&admin).await;
    assert!(env.last_text(ADMIN).contains(SHEET_LINK));

    open_admin_menu(&env).await;
}

#[tokio::test]
async fn test_non_admin_cannot_change_link() {
    let env = TestEnvironment::new().await;
    env.flow
        .on_set_link(&TestEnvironment::message(5, "/setlink"), "https://example.com/evil.xlsx")
        .await;

    assert!(env.transport.sent_to(5).is_empty());
    assert_eq!(env.flow.store().link().get().await.as_deref(), Some(SHEET_LINK));
}
