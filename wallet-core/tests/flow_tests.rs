//! End-to-end tests for the client flows
//!
//! Each test wires a `WalletContext` to the in-process demo backend, a
//! headless view, an in-memory credential store and a URL location, then
//! drives it the way a page load and user input would. Time is paused, so
//! minimum loading durations, the refresh interval and redirect delays run
//! instantly and deterministically.
//!
//! Run with: cargo test --test flow_tests

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use wallet_core::adapters::demo::DemoBackend;
use wallet_core::adapters::headless::{HeadlessView, Screen, ViewEvent};
use wallet_core::adapters::location::UrlLocation;
use wallet_core::adapters::store::{MemoryStore, LOGOUT_FLAG_KEY, SESSION_KEY};
use wallet_core::config::Config;
use wallet_core::domain::action::{CheckPin, GetTransactions, Login, Register, SetPin, Transfer, VerifyPin};
use wallet_core::domain::messages;
use wallet_core::ports::CredentialStore;
use wallet_core::services::{EntryPoint, EventLog, LoggingService};
use wallet_core::{AutoLogin, PaymentState, PendingPayment, RegistrationForm, WalletContext};

// ============================================================================
// Test Helpers
// ============================================================================

const BASE: &str = "https://wallet.local/";

struct Harness {
    backend: Arc<DemoBackend>,
    view: Arc<HeadlessView>,
    location: Arc<UrlLocation>,
    credentials: Arc<MemoryStore>,
    ctx: WalletContext,
}

fn harness(url: &str, credentials: MemoryStore) -> Harness {
    harness_with_events(url, credentials, EventLog::disabled())
}

fn harness_with_events(url: &str, credentials: MemoryStore, events: EventLog) -> Harness {
    let backend = Arc::new(DemoBackend::seeded());
    let view = Arc::new(HeadlessView::new());
    let location = Arc::new(UrlLocation::parse(url).expect("valid url"));
    let credentials = Arc::new(credentials);
    let ctx = WalletContext::with_parts(
        Config::default(),
        backend.clone(),
        credentials.clone(),
        view.clone(),
        location.clone(),
        events,
    );
    Harness {
        backend,
        view,
        location,
        credentials,
        ctx,
    }
}

fn deep_link(from: &str) -> String {
    format!("{}?from={}", BASE, from)
}

fn logged_out_store(username: &str, password: &str) -> MemoryStore {
    let store = MemoryStore::with_saved(username, password);
    store.put_raw(LOGOUT_FLAG_KEY, "true");
    store
}

/// Alice (ACC999) arriving through bob's (ACC123) payment link, at PIN entry
async fn alice_at_pin_entry() -> Harness {
    let h = harness(&deep_link("ACC123"), MemoryStore::with_saved("alice", "p1"));
    assert_eq!(h.ctx.start().await, AutoLogin::Restored);
    assert!(matches!(h.ctx.payment_state(), PaymentState::PinEntry { .. }));
    h
}

fn expected_pending() -> PendingPayment {
    PendingPayment::new("ACC123", "ACC999").unwrap()
}

// ============================================================================
// Auto-login
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_saved_session_shows_login() {
    let h = harness(BASE, MemoryStore::new());

    assert_eq!(h.ctx.start().await, AutoLogin::Skipped);
    assert_eq!(h.view.screen(), Screen::Login);
    assert_eq!(h.backend.calls::<Login>(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_saved_session_restores_dashboard() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));

    assert_eq!(h.ctx.start().await, AutoLogin::Restored);
    assert_eq!(h.view.screen(), Screen::Dashboard);
    assert_eq!(h.ctx.session().unwrap().account_id, "ACC999");
    assert!(h.ctx.updater.is_running());
    assert!(h
        .view
        .busy_messages()
        .contains(&messages::LOADING_AUTO_LOGIN.to_string()));
    assert!(!h.view.busy_visible());
}

#[tokio::test(start_paused = true)]
async fn test_logout_flag_suppresses_auto_login() {
    let h = harness(BASE, logged_out_store("alice", "p1"));

    assert_eq!(h.ctx.start().await, AutoLogin::Skipped);
    assert_eq!(h.backend.calls::<Login>(), 0);
    assert_eq!(h.view.screen(), Screen::Login);
}

#[tokio::test(start_paused = true)]
async fn test_deep_link_ignores_logout_flag() {
    let h = harness(&deep_link("ACC123"), logged_out_store("alice", "p1"));

    assert_eq!(h.ctx.start().await, AutoLogin::Restored);
    assert_eq!(h.backend.calls::<Login>(), 1);
    assert_eq!(h.view.screen(), Screen::Pin);
}

#[tokio::test(start_paused = true)]
async fn test_failed_auto_login_erases_saved_session() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "stale-password"));

    assert_eq!(h.ctx.start().await, AutoLogin::Failed);
    assert_eq!(h.view.screen(), Screen::Login);
    assert!(h.credentials.get_raw(SESSION_KEY).is_none());
    assert!(h.ctx.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_auto_login_with_deep_link_keeps_saved_session() {
    let h = harness(&deep_link("ACC123"), MemoryStore::with_saved("alice", "stale-password"));

    assert_eq!(h.ctx.start().await, AutoLogin::Failed);
    assert_eq!(h.view.screen(), Screen::Login);
    assert!(h.credentials.get_raw(SESSION_KEY).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_saved_session_counts_as_failed_login() {
    let store = MemoryStore::new();
    store.put_raw(SESSION_KEY, "{not json");
    let h = harness(BASE, store);

    assert_eq!(h.ctx.start().await, AutoLogin::Failed);
    assert_eq!(h.backend.calls::<Login>(), 0);
    assert!(h.credentials.get_raw(SESSION_KEY).is_none());
    assert_eq!(h.view.screen(), Screen::Login);
}

// ============================================================================
// Manual login and logout
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_manual_login_persists_and_clears_logout_flag() {
    let h = harness(BASE, logged_out_store("alice", "p1"));
    h.ctx.start().await;

    let session = h.ctx.login("bob", "p2").await.unwrap();

    assert_eq!(session.account_id, "ACC123");
    assert_eq!(h.view.screen(), Screen::Dashboard);
    assert_eq!(h.view.last_message(), Some((messages::welcome("bob"), false)));
    assert!(!h.credentials.is_logged_out().unwrap());
    let saved = h.credentials.load().unwrap().unwrap();
    assert_eq!(saved.username, "bob");
    assert_eq!(saved.password, "p2");
    assert_eq!(saved.account_id.as_deref(), Some("ACC123"));
}

#[tokio::test(start_paused = true)]
async fn test_manual_login_failure_surfaces_server_message() {
    let h = harness(BASE, MemoryStore::new());
    h.ctx.start().await;

    let err = h.ctx.login("bob", "wrong").await.unwrap_err();

    let (text, is_error) = h.view.last_message().unwrap();
    assert_eq!(text, err.to_string());
    assert!(is_error);
    assert!(h.ctx.session().is_none());
    assert!(h.credentials.load().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_post_login_failure_returns_to_login() {
    let h = harness(BASE, MemoryStore::new());
    h.ctx.start().await;
    h.backend.disconnect_next::<GetTransactions>("Unable to connect to the api service");

    assert!(h.ctx.login("alice", "p1").await.is_err());

    assert_eq!(h.view.screen(), Screen::Login);
    assert_eq!(
        h.view.last_message(),
        Some(("Unable to connect to the api service".to_string(), true))
    );
    assert!(!h.ctx.updater.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_logout_sets_flag_and_navigates_home() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;

    h.ctx.logout();

    assert!(h.ctx.session().is_none());
    assert!(h.ctx.transactions().is_empty());
    assert!(!h.ctx.updater.is_running());
    assert!(h.credentials.is_logged_out().unwrap());
    assert!(h.credentials.load().unwrap().is_none());
    assert_eq!(h.view.screen(), Screen::Login);
    assert_eq!(
        h.view.last_message(),
        Some((messages::LOGGED_OUT.to_string(), false))
    );
    assert!(h.location.take_navigation());
}

#[tokio::test(start_paused = true)]
async fn test_logout_during_deep_link_keeps_url_and_saved_session() {
    let h = alice_at_pin_entry().await;

    h.ctx.logout();

    assert!(!h.credentials.is_logged_out().unwrap());
    assert!(h.credentials.load().unwrap().is_some());
    assert!(!h.location.take_navigation());
    assert_eq!(h.ctx.payment_state(), PaymentState::Idle);
    assert_eq!(h.view.screen(), Screen::Login);
}

// ============================================================================
// Refresh loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_dashboard_refreshes_every_interval() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;
    let renders = h.view.dashboard_renders();

    h.backend.set_balance("ACC999", 4321);
    tokio::time::sleep(Duration::from_millis(10_100)).await;

    assert_eq!(h.ctx.session().unwrap().balance, 4321);
    assert_eq!(h.view.dashboard_renders(), renders + 1);
    // The refresh re-authenticates silently
    assert_eq!(h.backend.calls::<Login>(), 2);
    assert!(h.view.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_refresh_after_logout() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;
    h.ctx.logout();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.backend.calls::<Login>(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_is_silent() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;
    h.view.take_events();

    h.backend.fail_next::<Login>("一時的なエラー");
    tokio::time::sleep(Duration::from_millis(10_100)).await;

    assert!(h.view.messages().is_empty());
    assert!(h.ctx.session().is_some());
    assert!(h.ctx.updater.is_running());
}

// ============================================================================
// Deep-link payment
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_source_without_pin_aborts_and_redirects() {
    // carol (ACC555) has no PIN configured
    let h = harness(&deep_link("ACC555"), MemoryStore::with_saved("alice", "p1"));

    h.ctx.start().await;

    assert_eq!(h.ctx.payment_state(), PaymentState::Idle);
    assert!(h.ctx.payments.pending().is_none());
    assert!(h
        .view
        .messages()
        .contains(&(messages::SOURCE_PIN_NOT_SET.to_string(), true)));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(h.location.take_navigation());
}

#[tokio::test(start_paused = true)]
async fn test_source_pin_missing_redirects_within_delay() {
    let backend = Arc::new(DemoBackend::new());
    backend.insert_account("ACC999", "alice", "p1", 2000, Some("1234"));
    backend.insert_account("ACC123", "bob", "p2", 2000, None);
    let view = Arc::new(HeadlessView::new());
    let location = Arc::new(UrlLocation::parse(&deep_link("ACC123")).unwrap());
    let ctx = WalletContext::with_parts(
        Config::default(),
        backend.clone(),
        Arc::new(MemoryStore::with_saved("alice", "p1")),
        view.clone(),
        location.clone(),
        EventLog::disabled(),
    );

    assert_eq!(ctx.start().await, AutoLogin::Restored);
    assert_eq!(backend.calls::<CheckPin>(), 1);
    assert_eq!(ctx.payment_state(), PaymentState::Idle);
    assert!(ctx.payments.pending().is_none());

    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert!(!location.take_navigation());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(location.take_navigation());
}

#[tokio::test(start_paused = true)]
async fn test_link_to_own_account_is_rejected() {
    let h = harness(&deep_link("ACC999"), MemoryStore::with_saved("alice", "p1"));

    h.ctx.start().await;

    assert_eq!(h.backend.calls::<CheckPin>(), 0);
    assert!(h
        .view
        .messages()
        .contains(&(messages::SELF_TRANSFER.to_string(), true)));
    assert_eq!(h.ctx.payment_state(), PaymentState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_pin_verified_moves_to_amount_entry() {
    let h = alice_at_pin_entry().await;

    h.ctx.submit_pin("1234").await.unwrap();

    assert_eq!(
        h.ctx.payment_state(),
        PaymentState::AmountEntry {
            pending: expected_pending()
        }
    );
    assert!(h.view.events().contains(&ViewEvent::PinCleared));
    assert_eq!(h.view.screen(), Screen::Amount);
    assert!(h.view.events().contains(&ViewEvent::Amount {
        from_account_id: "ACC123".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_wrong_pin_never_advances() {
    let h = alice_at_pin_entry().await;

    for _ in 0..3 {
        assert!(h.ctx.submit_pin("9999").await.is_err());
        assert_eq!(
            h.ctx.payment_state(),
            PaymentState::PinEntry {
                pending: expected_pending()
            }
        );
    }
    assert_eq!(h.backend.calls::<VerifyPin>(), 3);
    assert_eq!(h.view.screen(), Screen::Pin);
}

#[tokio::test(start_paused = true)]
async fn test_complete_payment() {
    let h = alice_at_pin_entry().await;
    h.ctx.submit_pin("1234").await.unwrap();
    let history_fetches = h.backend.calls::<GetTransactions>();

    h.ctx.submit_amount(500).await.unwrap();

    assert_eq!(h.backend.calls::<Transfer>(), 1);
    assert_eq!(h.backend.calls::<GetTransactions>(), history_fetches + 1);
    // The payer's remaining balance, as reported by the server
    assert_eq!(h.ctx.session().unwrap().balance, 1500);
    assert_eq!(h.backend.balance_of("ACC999"), Some(2500));
    assert_eq!(h.ctx.transactions().len(), 1);
    assert_eq!(h.ctx.payment_state(), PaymentState::Done);
    assert!(h.ctx.payments.pending().is_none());
    assert_eq!(
        h.view.last_message(),
        Some((messages::TRANSFER_COMPLETED.to_string(), false))
    );

    assert!(!h.location.take_navigation());
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(h.location.take_navigation());
}

#[tokio::test(start_paused = true)]
async fn test_amount_without_pin_is_rejected() {
    let h = alice_at_pin_entry().await;

    let err = h.ctx.submit_amount(100).await.unwrap_err();

    assert_eq!(err.to_string(), messages::PAYMENT_NOT_FOUND);
    assert_eq!(h.backend.calls::<Transfer>(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_navigates_immediately() {
    let h = alice_at_pin_entry().await;
    h.ctx.submit_pin("1234").await.unwrap();

    h.ctx.cancel_payment();

    assert_eq!(h.ctx.payment_state(), PaymentState::Idle);
    assert!(h.location.take_navigation());
    assert_eq!(h.backend.calls::<Transfer>(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_refresh_loop_during_payment() {
    let h = alice_at_pin_entry().await;

    assert!(!h.ctx.updater.is_running());
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(h.backend.calls::<Login>(), 1);
}

// ============================================================================
// Direct transfer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_direct_transfer_returns_to_dashboard() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;
    let renders = h.view.dashboard_renders();

    h.ctx.transfer("ACC123", 700).await.unwrap();

    assert_eq!(h.ctx.session().unwrap().balance, 1300);
    assert_eq!(h.view.dashboard_renders(), renders + 1);
    assert!(h.ctx.updater.is_running());
    assert!(h
        .view
        .busy_messages()
        .contains(&messages::LOADING_TRANSFER.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_direct_transfer_over_balance_is_rejected_locally() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;

    let err = h.ctx.transfer("ACC123", 2001).await.unwrap_err();

    assert_eq!(err.to_string(), messages::INSUFFICIENT_BALANCE);
    assert_eq!(h.backend.calls::<Transfer>(), 0);
}

// ============================================================================
// Registration
// ============================================================================

fn registration(pin: &str, confirm_pin: &str) -> RegistrationForm {
    RegistrationForm {
        username: "dave".into(),
        password: "secret".into(),
        confirm_password: "secret".into(),
        pin: pin.into(),
        confirm_pin: confirm_pin.into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_register_creates_account_with_pin() {
    let h = harness(BASE, MemoryStore::new());
    h.ctx.start().await;

    let account_id = h.ctx.register(&registration("4321", "4321")).await.unwrap();

    assert_eq!(h.backend.calls::<Register>(), 1);
    assert_eq!(h.backend.calls::<SetPin>(), 1);
    assert_eq!(h.view.screen(), Screen::Login);
    assert_eq!(
        h.view.last_message(),
        Some((messages::ACCOUNT_CREATED.to_string(), false))
    );

    // The new account can be logged into and its PIN is set
    let session = h.ctx.login("dave", "secret").await.unwrap();
    assert_eq!(session.account_id, account_id);
    assert_eq!(session.balance, 0);
}

#[tokio::test(start_paused = true)]
async fn test_register_validation_happens_before_network() {
    let h = harness(BASE, MemoryStore::new());

    let mut form = registration("4321", "4321");
    form.confirm_password = "other".into();
    let err = h.ctx.register(&form).await.unwrap_err();
    assert_eq!(err.to_string(), messages::PASSWORD_MISMATCH);

    let err = h.ctx.register(&registration("4321", "1234")).await.unwrap_err();
    assert_eq!(err.to_string(), messages::PIN_MISMATCH);

    let err = h.ctx.register(&registration("12345", "12345")).await.unwrap_err();
    assert_eq!(err.to_string(), messages::PIN_FORMAT);

    assert!(h.backend.journal().is_empty());
}

// ============================================================================
// Global handlers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unhandled_error_shown_only_when_idle() {
    let h = harness(BASE, MemoryStore::new());

    h.ctx.report_unhandled(&"boom");
    assert_eq!(
        h.view.last_message(),
        Some((messages::GENERIC_ERROR.to_string(), true))
    );

    h.view.take_events();
    h.backend.set_latency::<Login>(Duration::from_secs(1));
    let login = h.ctx.login("alice", "p1");
    let report = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.ctx.report_unhandled(&"late failure");
    };
    let (result, ()) = tokio::join!(login, report);
    result.unwrap();

    assert!(!h
        .view
        .messages()
        .contains(&(messages::GENERIC_ERROR.to_string(), true)));
}

#[tokio::test(start_paused = true)]
async fn test_network_status_hooks() {
    let h = harness(BASE, MemoryStore::with_saved("alice", "p1"));
    h.ctx.start().await;

    h.ctx.network_offline();
    assert!(!h.ctx.updater.is_running());
    assert_eq!(
        h.view.last_message(),
        Some((messages::NETWORK_OFFLINE.to_string(), true))
    );

    h.ctx.network_online();
    assert!(h.ctx.updater.is_running());
    assert_eq!(
        h.view.last_message(),
        Some((messages::NETWORK_ONLINE.to_string(), false))
    );
}

#[tokio::test(start_paused = true)]
async fn test_network_online_during_pin_entry_keeps_payment_form() {
    let h = alice_at_pin_entry().await;

    h.ctx.network_offline();
    h.ctx.network_online();
    assert!(!h.ctx.updater.is_running());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.view.screen(), Screen::Pin);
    assert!(matches!(h.ctx.payment_state(), PaymentState::PinEntry { .. }));
    assert_eq!(h.view.dashboard_renders(), 0);
    // Only the auto-login itself
    assert_eq!(h.backend.calls::<Login>(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_online_during_amount_entry_keeps_payment_form() {
    let h = alice_at_pin_entry().await;
    h.ctx.submit_pin("1234").await.unwrap();
    assert!(matches!(h.ctx.payment_state(), PaymentState::AmountEntry { .. }));

    h.ctx.network_online();
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(!h.ctx.updater.is_running());
    assert_eq!(h.view.screen(), Screen::Amount);
}

#[tokio::test(start_paused = true)]
async fn test_network_online_without_session_does_not_poll() {
    let h = harness(BASE, MemoryStore::new());
    h.ctx.network_online();
    assert!(!h.ctx.updater.is_running());
}

// ============================================================================
// Event log
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_flows_write_privacy_safe_events() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Cli, "test").unwrap());
    let h = harness_with_events(
        &deep_link("ACC123"),
        MemoryStore::with_saved("alice", "p1"),
        EventLog::new(Arc::clone(&logger)),
    );

    h.ctx.start().await;
    h.ctx.submit_pin("0000").await.unwrap_err();
    h.ctx.submit_pin("1234").await.unwrap();
    h.ctx.submit_amount(250).await.unwrap();

    let events: Vec<String> = logger
        .get_recent(20)
        .unwrap()
        .into_iter()
        .map(|entry| entry.event)
        .collect();
    assert!(events.contains(&"payment_started".to_string()));
    assert!(events.contains(&"pin_rejected".to_string()));
    assert!(events.contains(&"payment_completed".to_string()));

    // Neither credentials nor PINs reach the log
    for entry in logger.get_recent(20).unwrap() {
        let texts = [entry.flow, entry.action, entry.error_message, entry.error_details];
        for text in texts.iter().flatten() {
            assert!(!text.contains("p1"));
            assert!(!text.contains("1234"));
            assert!(!text.contains("0000"));
        }
    }
}
