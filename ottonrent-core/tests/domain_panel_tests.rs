// tests/domain_panel_tests.rs

use std::sync::Arc;

use serde_json::{Value, json};

use ottonrent_common::ValidationError;
use ottonrent_common::models::{AdminTier, StorePath, TransactionKind, UiPayload};
use ottonrent_common::traits::RemoteStore;
use ottonrent_core::Error;
use ottonrent_core::panels::admins::AdminsPanel;
use ottonrent_core::panels::orders::OrdersPanel;
use ottonrent_core::panels::referrals::ReferralsPanel;
use ottonrent_core::panels::slots::SlotsPanel;
use ottonrent_core::panels::transactions::TransactionsPanel;
use ottonrent_core::panels::ui_config::UiConfigPanel;
use ottonrent_core::panels::users::UsersPanel;
use ottonrent_core::test_utils::helpers::*;

fn path(raw: &str) -> StorePath {
    StorePath::parse(raw)
}

fn doubles(data: Value) -> (RecordingStore, RecordingNotifier) {
    (RecordingStore::with_data(data), RecordingNotifier::new())
}

// ----------------------------------------------------------------------
// admins
// ----------------------------------------------------------------------

#[tokio::test]
async fn admin_ids_must_be_numeric_and_tiers_disjoint() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({
        "admin_config": {"superior_admins": [1], "inferior_admins": [2]}
    }));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(
        panel.add_admin("12ab", AdminTier::Inferior).await,
        Err(Error::Validation(ValidationError::NotNumeric { .. }))
    ));
    assert!(matches!(
        panel.add_admin("1", AdminTier::Inferior).await,
        Err(Error::Validation(ValidationError::AdminTierConflict { id: 1, .. }))
    ));
    assert!(store.writes().is_empty());
    assert!(notifier.notices().is_empty());

    panel.add_admin(" 3 ", AdminTier::Inferior).await?;
    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(path("/admin_config"), json!({"inferior_admins": [2, 3]}))]
    );

    let config = panel.config();
    assert!(config.superior_admins.is_disjoint(&config.inferior_admins));
    Ok(())
}

#[tokio::test]
async fn first_admin_creates_the_document() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({}));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;

    panel.add_admin("42", AdminTier::Superior).await?;
    assert_eq!(
        store.writes(),
        vec![StoreCall::Set(
            path("/admin_config"),
            json!({"superior_admins": [42], "inferior_admins": []})
        )]
    );
    assert_eq!(panel.config().tier_of(42), Some(AdminTier::Superior));
    Ok(())
}

#[tokio::test]
async fn admin_ids_stored_as_text_are_kept_when_granting() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({
        "admin_config": {"superior_admins": ["111", "222"], "inferior_admins": ["333"]}
    }));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;
    assert_eq!(panel.config().tier_of(222), Some(AdminTier::Superior));

    panel.add_admin("444", AdminTier::Inferior).await?;
    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(path("/admin_config"), json!({"inferior_admins": [333, 444]}))]
    );
    assert_eq!(store.dump()["admin_config"]["superior_admins"], json!(["111", "222"]));
    Ok(())
}

#[tokio::test]
async fn an_unreadable_admin_document_is_never_replaced() -> Result<(), Error> {
    let stored = json!({"superior_admins": "all", "inferior_admins": [5]});
    let (store, notifier) = doubles(json!({"admin_config": stored.clone()}));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(
        panel.add_admin("7", AdminTier::Superior).await,
        Err(Error::Decode { .. })
    ));
    assert!(store.writes().is_empty());
    assert_eq!(store.dump()["admin_config"], stored);
    assert!(panel.session().name() == "viewing");
    Ok(())
}

#[tokio::test]
async fn revoking_an_admin_needs_confirmation() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({
        "admin_config": {"superior_admins": [1], "inferior_admins": [2, 3]}
    }));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(panel.request_revoke(9, AdminTier::Inferior), Err(Error::NotFound(_))));

    panel.request_revoke(2, AdminTier::Inferior)?;
    assert!(store.writes().is_empty());
    panel.confirm().await?;

    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(path("/admin_config/inferior_admins"), json!([3]))]
    );
    assert_eq!(panel.config().tier_of(2), None);
    assert_eq!(notifier.successes(), 1);
    Ok(())
}

#[tokio::test]
async fn revoking_an_admin_someone_else_removed_sends_nothing() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({
        "admin_config": {"superior_admins": [1], "inferior_admins": [2, 3]}
    }));
    let mut panel = AdminsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        AdminsPanel::options(path("/admin_config")),
    );
    panel.wait_until_loaded().await?;

    panel.request_revoke(3, AdminTier::Inferior)?;
    let seen = panel.snapshot_generation();
    store
        .memory()
        .set(&path("/admin_config/inferior_admins"), json!([2]))
        .await?;
    panel.wait_for_generation(seen + 1).await?;

    panel.confirm().await?;
    assert!(store.writes().is_empty());
    assert_eq!(notifier.successes(), 1);
    Ok(())
}

// ----------------------------------------------------------------------
// transactions
// ----------------------------------------------------------------------

fn transactions_seed() -> Value {
    json!({
        "transactions": {
            "A": {"approved_at": "2024-01-01T10:00:00Z", "slot_id": "slot1"},
            "FTRIAL-ID": {
                "FTRIAL-ID-OTTONRENT": true,
                "u1": {"approved_at": "2024-03-01 09:00:00", "slot_id": "slot2"}
            },
            "REF-ID": {
                "u2": {"approved_at": "not a date"}
            }
        }
    })
}

#[tokio::test]
async fn transactions_are_partitioned_and_sorted() -> Result<(), Error> {
    let (store, notifier) = doubles(transactions_seed());
    let panel = TransactionsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        TransactionsPanel::options(path("/transactions")),
    );
    panel.wait_until_loaded().await?;

    let rows = panel.rows();
    let shown: Vec<(&str, &str)> = rows.iter().map(|r| (r.id.as_str(), r.label)).collect();
    assert_eq!(shown, vec![("u1", "Free Trial"), ("A", "Regular"), ("u2", "Referral")]);
    assert_eq!(rows[2].approved_display(), "Unknown");
    Ok(())
}

#[tokio::test]
async fn deleting_a_special_transaction_keeps_the_sentinel() -> Result<(), Error> {
    let (store, notifier) = doubles(transactions_seed());
    let mut panel = TransactionsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        TransactionsPanel::options(path("/transactions")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(
        panel.request_delete(TransactionKind::FreeTrial, "nope"),
        Err(Error::NotFound(_))
    ));

    panel.request_delete(TransactionKind::FreeTrial, "u1")?;
    panel.confirm().await?;

    assert_eq!(store.writes(), vec![StoreCall::Remove(path("/transactions/FTRIAL-ID/u1"))]);
    assert_eq!(
        store.dump()["transactions"]["FTRIAL-ID"],
        json!({"FTRIAL-ID-OTTONRENT": true})
    );
    assert!(panel.rows().iter().all(|r| r.id != "u1"));
    assert_eq!(notifier.successes(), 1);
    Ok(())
}

// ----------------------------------------------------------------------
// referrals
// ----------------------------------------------------------------------

fn referrals_seed() -> Value {
    json!({
        "referrals": {
            "u1": {"referral_code": "ALPHA", "referral_points": 5, "referred_users": ["x"]},
            "u2": {"referral_code": "BETA", "referral_points": 40, "referred_users": []},
            "u3": {"referral_code": "gamma", "referral_points": 15}
        },
        "referral_settings": {
            "free_trial_enabled": true,
            "buy_with_points_enabled": false,
            "points_per_referral": 10,
            "required_point": 30
        }
    })
}

async fn mount_referrals(store: &RecordingStore, notifier: &RecordingNotifier) -> Result<ReferralsPanel, Error> {
    let panel = ReferralsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        ReferralsPanel::options(path("/referrals"), path("/referral_settings")),
    );
    panel.wait_until_loaded().await?;
    Ok(panel)
}

#[tokio::test]
async fn referrals_sort_by_points_and_search_ignores_case() -> Result<(), Error> {
    let (store, notifier) = doubles(referrals_seed());
    let panel = mount_referrals(&store, &notifier).await?;

    let order: Vec<String> = panel.rows("").into_iter().map(|r| r.user_id).collect();
    assert_eq!(order, vec!["u2", "u3", "u1"]);

    let hits: Vec<String> = panel.rows("GAMMA").into_iter().map(|r| r.user_id).collect();
    assert_eq!(hits, vec!["u3"]);
    Ok(())
}

#[tokio::test]
async fn recording_a_referral_awards_points() -> Result<(), Error> {
    let (store, notifier) = doubles(referrals_seed());
    let mut panel = mount_referrals(&store, &notifier).await?;

    panel.record_referral("u1", "newbie").await?;
    let stored = store.dump()["referrals"]["u1"].clone();
    assert_eq!(stored["referral_points"], json!(15));
    assert_eq!(stored["referred_users"], json!(["x", "newbie"]));

    store.clear_calls();
    assert!(matches!(
        panel.record_referral("u1", "newbie").await,
        Err(Error::Validation(ValidationError::AlreadyReferred(_)))
    ));
    assert!(store.writes().is_empty());
    Ok(())
}

#[tokio::test]
async fn redeeming_points_follows_the_settings() -> Result<(), Error> {
    let (store, notifier) = doubles(referrals_seed());
    let mut panel = mount_referrals(&store, &notifier).await?;

    assert!(matches!(
        panel.redeem_points("u2").await,
        Err(Error::Validation(ValidationError::PointsPurchaseDisabled))
    ));

    panel.update_settings(|s| s.buy_with_points_enabled = true).await?;
    assert!(panel.settings().buy_with_points_enabled);

    panel.redeem_points("u2").await?;
    assert_eq!(store.dump()["referrals"]["u2"]["referral_points"], json!(10));

    assert!(matches!(
        panel.redeem_points("u1").await,
        Err(Error::Validation(ValidationError::InsufficientPoints { have: 5, need: 30 }))
    ));
    Ok(())
}

// ----------------------------------------------------------------------
// users, orders, slots, ui config
// ----------------------------------------------------------------------

#[tokio::test]
async fn deactivating_a_user_is_confirmed_and_writes_the_flag() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({"users": {"1001": true, "1002": false}}));
    let mut panel = UsersPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        UsersPanel::options(path("/users")),
    );
    panel.wait_until_loaded().await?;

    panel.request_deactivate("1001")?;
    panel.confirm().await?;
    assert_eq!(store.writes(), vec![StoreCall::Update(path("/users/1001"), json!(false))]);
    assert_eq!(panel.get("1001"), Some(false));

    store.clear_calls();
    panel.activate("1002").await?;
    assert_eq!(store.writes(), vec![StoreCall::Update(path("/users/1002"), json!(true))]);

    let rows = panel.rows("100");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user_id, "1001");
    Ok(())
}

#[tokio::test]
async fn switching_a_user_off_without_confirmation_writes_nothing() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({"users": {"1001": true, "1002": true, "1003": false}}));
    let mut panel = UsersPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        UsersPanel::options(path("/users")),
    );
    panel.wait_until_loaded().await?;
    assert_eq!(panel.active_count(), 2);

    let result = panel
        .modify("1001", |active| {
            *active = false;
            Ok(())
        })
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::ConfirmationRequired(_)))
    ));
    assert!(store.writes().is_empty());
    assert_eq!(panel.get("1001"), Some(true));
    assert_eq!(panel.active_count(), 2);

    panel.activate("1003").await?;
    assert_eq!(store.writes(), vec![StoreCall::Update(path("/users/1003"), json!(true))]);
    assert_eq!(panel.active_count(), 3);
    Ok(())
}

#[tokio::test]
async fn an_order_cannot_be_redeemed_twice() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({"used_order_ids": {"ORD-1": true}}));
    let mut panel = OrdersPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        OrdersPanel::options(path("/used_order_ids")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(
        panel.redeem("ORD-1").await,
        Err(Error::Validation(ValidationError::OrderAlreadyUsed(_)))
    ));
    panel.redeem("  ORD-2 ").await?;
    assert_eq!(store.writes(), vec![StoreCall::Set(path("/used_order_ids/ORD-2"), json!(true))]);
    assert!(panel.is_used("ORD-2"));
    assert!(panel.redeem("ORD-2").await.is_err());
    Ok(())
}

#[tokio::test]
async fn slot_operations_respect_the_slot_shape() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({
        "slots": {
            "s1": {
                "enabled": true,
                "frequency": "weekly",
                "required_amount": 99.0,
                "slot_start": "2025-01-01T00:00:00Z",
                "slot_end": "2025-01-08T00:00:00Z",
                "last_update": "2025-01-01T00:00:00Z"
            },
            "s2": {"title": "Family", "monthly_price": 14.5, "num_devices": 4, "stock": 1}
        }
    }));
    let mut panel = SlotsPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        SlotsPanel::options(path("/slots")),
    );
    panel.wait_until_loaded().await?;

    assert!(panel.set_enabled("s2", false).await.is_err());
    assert!(panel.adjust_stock("s1", 1).await.is_err());
    assert!(panel.adjust_stock("s2", -2).await.is_err());
    assert!(store.writes().is_empty());

    panel.set_enabled("s1", false).await?;
    panel.adjust_stock("s2", 3).await?;
    assert_eq!(store.dump()["slots"]["s1"]["enabled"], json!(false));
    assert_eq!(store.dump()["slots"]["s2"]["stock"], json!(4));
    assert_eq!(panel.rows().len(), 2);

    panel.request_delete("s2")?;
    panel.confirm().await?;
    assert!(store.dump()["slots"].get("s2").is_none());
    Ok(())
}

#[tokio::test]
async fn ui_screens_are_edited_through_the_session() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({"ui_config": {"welcome": "Hi"}}));
    let mut panel = UiConfigPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        UiConfigPanel::options(path("/ui_config")),
    );
    panel.wait_until_loaded().await?;

    panel
        .set_screen(
            "banner",
            UiPayload::media("https://cdn.example/banner.png", None),
        )
        .await?;
    assert_eq!(
        store.dump()["ui_config"]["banner"],
        json!({"url": "https://cdn.example/banner.png"})
    );

    assert!(matches!(
        panel
            .set_screen("hero", UiPayload::media("", None))
            .await,
        Err(Error::Validation(_))
    ));

    panel.request_remove_screen("welcome")?;
    panel.confirm().await?;
    assert!(store.dump()["ui_config"].get("welcome").is_none());
    Ok(())
}

#[tokio::test]
async fn a_screen_is_added_next_to_richer_stored_screens() -> Result<(), Error> {
    let stored = json!({
        "welcome": "Hi",
        "faq": [{"q": "How?", "a": "..."}],
        "promo": {"media_url": "https://cdn.example/p.mp4", "autoplay": true}
    });
    let (store, notifier) = doubles(json!({"ui_config": stored.clone()}));
    let mut panel = UiConfigPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        UiConfigPanel::options(path("/ui_config")),
    );
    panel.wait_until_loaded().await?;

    panel.set_screen("banner", UiPayload::Text("Sale".into())).await?;
    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(path("/ui_config"), json!({"banner": "Sale"}))]
    );
    let mut expected = stored;
    expected["banner"] = json!("Sale");
    assert_eq!(store.dump()["ui_config"], expected);
    Ok(())
}

#[tokio::test]
async fn an_unreadable_ui_document_is_never_replaced() -> Result<(), Error> {
    let (store, notifier) = doubles(json!({"ui_config": "legacy"}));
    let mut panel = UiConfigPanel::mount(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        UiConfigPanel::options(path("/ui_config")),
    );
    panel.wait_until_loaded().await?;

    assert!(matches!(
        panel.set_screen("banner", UiPayload::Text("Sale".into())).await,
        Err(Error::Decode { .. })
    ));
    assert!(store.writes().is_empty());
    assert_eq!(store.dump()["ui_config"], json!("legacy"));

    let seen = panel.snapshot_generation();
    store.memory().set(&path("/ui_config"), json!({"welcome": "Hi"})).await?;
    panel.wait_for_generation(seen + 1).await?;
    panel.set_screen("banner", UiPayload::Text("Sale".into())).await?;
    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(path("/ui_config"), json!({"banner": "Sale"}))]
    );
    Ok(())
}
