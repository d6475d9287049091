// tests/auth_tests.rs

use std::sync::Arc;

use ottonrent_common::models::Tenant;
use ottonrent_common::traits::RemoteStore;
use ottonrent_core::Error;
use ottonrent_core::auth::{SessionManager, SessionState};
use ottonrent_core::eventbus::{DashboardEvent, EventBus};
use ottonrent_core::selector::ServiceSelector;
use ottonrent_core::store::InMemoryStore;
use ottonrent_core::test_utils::helpers::StaticAuthProvider;
use tokio_test::{assert_err, assert_ok};

fn provider() -> Arc<StaticAuthProvider> {
    Arc::new(
        StaticAuthProvider::new()
            .with_account("ops@ottonrent.io", "hunter2", &[Tenant::Netflix, Tenant::Prime], true)
            .with_account("viewer@ottonrent.io", "pw", &[Tenant::Netflix], false)
            .with_token("INV-1", Tenant::Netflix),
    )
}

#[tokio::test]
async fn sign_in_and_out_move_through_explicit_states() -> Result<(), Error> {
    let bus = EventBus::new();
    let mut events = bus.subscribe(Some(8)).await;
    let manager = SessionManager::new(provider()).with_bus(bus.clone());
    assert_eq!(manager.state().await, SessionState::SignedOut);

    let session = manager.sign_in("ops@ottonrent.io", "hunter2", Tenant::Netflix).await?;
    assert_eq!(session.tenant, Tenant::Netflix);
    assert_eq!(manager.state().await.tenant(), Some(Tenant::Netflix));

    assert!(matches!(
        manager.sign_in("ops@ottonrent.io", "hunter2", Tenant::Prime).await,
        Err(Error::Auth(_))
    ));

    manager.sign_out().await?;
    assert_eq!(manager.state().await, SessionState::SignedOut);
    // signing out twice is harmless
    manager.sign_out().await?;

    let first = events.recv().await;
    let second = events.recv().await;
    assert!(matches!(
        first,
        Some(DashboardEvent::SessionChanged { tenant: Some(Tenant::Netflix) })
    ));
    assert!(matches!(second, Some(DashboardEvent::SessionChanged { tenant: None })));
    Ok(())
}

#[tokio::test]
async fn non_admins_are_turned_away() -> Result<(), Error> {
    let provider = provider();
    let manager = SessionManager::new(provider.clone());

    assert!(matches!(
        manager.sign_in("viewer@ottonrent.io", "pw", Tenant::Netflix).await,
        Err(Error::Auth(_))
    ));
    assert_eq!(manager.state().await, SessionState::SignedOut);
    assert_eq!(provider.sign_out_count(), 1);

    assert_err!(manager.sign_in("ops@ottonrent.io", "wrong", Tenant::Netflix).await);
    assert_err!(manager.sign_in("ops@ottonrent.io", "hunter2", Tenant::Crunchyroll).await);
    assert_eq!(provider.sign_out_count(), 1);
    Ok(())
}

#[tokio::test]
async fn stores_are_handed_out_for_the_session_tenant_only() -> Result<(), Error> {
    let netflix: Arc<dyn RemoteStore> = Arc::new(InMemoryStore::new());
    let prime: Arc<dyn RemoteStore> = Arc::new(InMemoryStore::new());
    let selector = ServiceSelector::with_stores([(Tenant::Netflix, netflix.clone()), (Tenant::Prime, prime)]);
    let manager = SessionManager::new(provider());

    assert!(matches!(manager.store_for(&selector, Tenant::Netflix).await, Err(Error::Auth(_))));

    manager.sign_in("ops@ottonrent.io", "hunter2", Tenant::Netflix).await?;
    let store = assert_ok!(manager.store_for(&selector, Tenant::Netflix).await);
    assert!(Arc::ptr_eq(&store, &netflix));
    assert!(matches!(manager.store_for(&selector, Tenant::Prime).await, Err(Error::Auth(_))));
    Ok(())
}

#[tokio::test]
async fn invitation_tokens_are_single_use_and_tenant_bound() -> Result<(), Error> {
    let provider = provider();
    let manager = SessionManager::new(provider.clone());

    assert!(!manager.redeem_invitation("INV-1", Tenant::Prime).await?);
    assert!(manager.redeem_invitation(" INV-1 ", Tenant::Netflix).await?);
    assert!(provider.is_consumed("INV-1"));
    assert!(!manager.redeem_invitation("INV-1", Tenant::Netflix).await?);
    assert!(!manager.redeem_invitation("", Tenant::Netflix).await?);
    Ok(())
}

#[tokio::test]
async fn issued_invitations_redeem_once_for_their_tenant() -> Result<(), Error> {
    let provider = provider();
    let manager = SessionManager::new(provider.clone());
    assert_err!(manager.issue_invitation().await);

    manager.sign_in("ops@ottonrent.io", "hunter2", Tenant::Prime).await?;
    let token = assert_ok!(manager.issue_invitation().await);
    assert!(!manager.redeem_invitation(&token, Tenant::Netflix).await?);
    assert!(manager.redeem_invitation(&token, Tenant::Prime).await?);
    assert!(provider.is_consumed(&token));
    assert!(!manager.redeem_invitation(&token, Tenant::Prime).await?);
    Ok(())
}
