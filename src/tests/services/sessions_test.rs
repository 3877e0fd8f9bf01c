use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionSigner;
use crate::client_mock::{setup_mock_backend, MockPortalApi};
use crate::error::BookingError;
use crate::services::sessions::{spawn_session_sweeper, SessionRegistry};
use crate::tests::common::fixtures::PATIENT_ID;
use crate::tests::common::test_utils::TEST_SIGNING_KEY;

fn registry() -> SessionRegistry {
    let (api, _book) = setup_mock_backend(PATIENT_ID);
    SessionRegistry::new(Arc::new(api), SessionSigner::new(TEST_SIGNING_KEY))
}

#[tokio::test]
async fn test_login_opens_session() {
    let registry = registry();

    let (handle, controller) = registry
        .login(" patient@example.com ", "secret")
        .await
        .unwrap();

    assert_eq!(controller.session().user_id(), PATIENT_ID);
    assert_eq!(controller.session().user.email, "patient@example.com");
    assert_eq!(registry.active_count().await, 1);

    let found = registry.get(&handle).await.unwrap();
    assert!(Arc::ptr_eq(&found, &controller));
}

#[tokio::test]
async fn test_each_login_gets_its_own_controller() {
    let registry = registry();

    let (first, _) = registry.login("patient@example.com", "secret").await.unwrap();
    let (second, _) = registry.login("patient@example.com", "secret").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(registry.active_count().await, 2);
    assert!(!Arc::ptr_eq(
        &registry.get(&first).await.unwrap(),
        &registry.get(&second).await.unwrap()
    ));
}

#[tokio::test]
async fn test_bad_password_is_unauthorized() {
    let registry = registry();

    let err = registry
        .login("patient@example.com", "wrong")
        .await
        .err()
        .unwrap();

    assert!(matches!(err, BookingError::Unauthorized(_)));
    assert_eq!(registry.active_count().await, 0);
}

#[tokio::test]
async fn test_empty_credentials_never_reach_backend() {
    let mut api = MockPortalApi::new();
    api.expect_login().never();
    api.expect_current_user().never();
    let registry = SessionRegistry::new(Arc::new(api), SessionSigner::new(TEST_SIGNING_KEY));

    assert!(matches!(
        registry.login("   ", "secret").await,
        Err(BookingError::Validation(_))
    ));
    assert!(matches!(
        registry.login("patient@example.com", "").await,
        Err(BookingError::Validation(_))
    ));
}

#[tokio::test]
async fn test_tampered_handle_is_rejected() {
    let registry = registry();
    let (handle, _) = registry.login("patient@example.com", "secret").await.unwrap();

    let (id, _) = handle.split_once('.').unwrap();
    let forged = format!("{}.{}", id, "bm90LWEtc2lnbmF0dXJl");

    assert_eq!(
        registry.get(&forged).await.err().unwrap(),
        BookingError::SessionNotFound
    );
    assert_eq!(
        registry.get("no-dot-here").await.err().unwrap(),
        BookingError::SessionNotFound
    );
}

#[tokio::test]
async fn test_logout_closes_session() {
    let registry = registry();
    let (handle, _) = registry.login("patient@example.com", "secret").await.unwrap();

    registry.logout(&handle).await.unwrap();

    assert_eq!(registry.active_count().await, 0);
    assert_eq!(
        registry.get(&handle).await.err().unwrap(),
        BookingError::SessionNotFound
    );
    assert_eq!(
        registry.logout(&handle).await.unwrap_err(),
        BookingError::SessionNotFound
    );
}

#[tokio::test]
async fn test_purge_idle_expires_only_idle_sessions() {
    let registry = registry();
    let (handle, _) = registry.login("patient@example.com", "secret").await.unwrap();

    assert_eq!(registry.purge_idle(Duration::from_secs(3600)).await, 0);
    assert!(registry.get(&handle).await.is_ok());

    assert_eq!(registry.purge_idle(Duration::ZERO).await, 1);
    assert_eq!(registry.active_count().await, 0);
    assert_eq!(
        registry.get(&handle).await.err().unwrap(),
        BookingError::SessionNotFound
    );
}

#[tokio::test]
async fn test_sweeper_expires_idle_sessions() {
    let registry = Arc::new(registry());
    registry.login("patient@example.com", "secret").await.unwrap();
    registry.login("patient@example.com", "secret").await.unwrap();

    let sweeper = spawn_session_sweeper(
        Arc::clone(&registry),
        Duration::ZERO,
        Duration::from_millis(10),
    );

    for _ in 0..50 {
        if registry.active_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sweeper.abort();

    assert_eq!(registry.active_count().await, 0);
}
