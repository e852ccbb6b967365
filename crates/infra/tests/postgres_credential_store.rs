//! Postgres credential store against a real database.
//!
//! Run with `CREDO_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
//! Rows are keyed by fresh ids, so a shared database is fine.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use credo_auth::{
    AccessCredential, AccessCredentialId, CredentialStatus, Origin, PrincipalId,
    RefreshCredential, RefreshCredentialId, generate_refresh_value,
};
use credo_infra::{CredentialStore, PostgresCredentialStore, db};

const ENV_TEST_DATABASE_URL: &str = "CREDO_TEST_DATABASE_URL";

async fn store() -> Option<Arc<PostgresCredentialStore>> {
    let Ok(url) = std::env::var(ENV_TEST_DATABASE_URL) else {
        eprintln!("{ENV_TEST_DATABASE_URL} not set; skipping");
        return None;
    };
    let pool = db::connect(&url).await.expect("connect to test database");
    let store = PostgresCredentialStore::new(pool);
    store.ensure_schema().await.expect("create schema");
    Some(Arc::new(store))
}

fn refresh_issued_at(principal_id: PrincipalId, now: DateTime<Utc>) -> RefreshCredential {
    RefreshCredential {
        id: RefreshCredentialId::new(),
        value: generate_refresh_value(),
        principal_id,
        issued_at: now,
        expires_at: now + Duration::days(7),
        revoked: false,
        last_used_at: None,
        usage_count: 0,
        origin: Origin::new(Some("198.51.100.4".to_string()), None),
    }
}

fn access_for(refresh: &RefreshCredential, now: DateTime<Utc>) -> AccessCredential {
    AccessCredential {
        id: AccessCredentialId::new(),
        value: format!("access-{}", AccessCredentialId::new()),
        principal_id: refresh.principal_id,
        refresh_id: Some(refresh.id),
        issued_at: now,
        expires_at: now + Duration::hours(1),
        status: CredentialStatus::Active,
        origin: Origin::default(),
    }
}

#[tokio::test]
#[ignore = "needs CREDO_TEST_DATABASE_URL"]
async fn rotation_counts_uses_and_refuses_terminal_refresh() {
    let Some(store) = store().await else { return };
    let now = Utc::now();
    let refresh = refresh_issued_at(PrincipalId::new(), now);
    store.insert_pair(&access_for(&refresh, now), &refresh).await.unwrap();

    for expected in 1..=2u64 {
        let rotated = access_for(&refresh, now);
        let updated = store
            .record_rotation(refresh.id, &rotated, now)
            .await
            .unwrap()
            .expect("usable refresh rotates");
        assert_eq!(updated.usage_count, expected);
        assert!(updated.last_used_at.is_some());
        assert!(store.find_access_by_value(&rotated.value).await.unwrap().is_some());
    }

    // Expired at `now`: nothing changes, no access row appears.
    let late = refresh.expires_at + Duration::seconds(1);
    let refused = access_for(&refresh, late);
    assert!(store.record_rotation(refresh.id, &refused, late).await.unwrap().is_none());
    assert!(store.find_access_by_value(&refused.value).await.unwrap().is_none());

    assert!(store.revoke_refresh(refresh.id).await.unwrap());
    assert!(!store.revoke_refresh(refresh.id).await.unwrap());
    let after_revoke = access_for(&refresh, now);
    assert!(store.record_rotation(refresh.id, &after_revoke, now).await.unwrap().is_none());

    let current = store.find_refresh(refresh.id).await.unwrap().unwrap();
    assert_eq!(current.usage_count, 2);
    assert!(current.revoked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs CREDO_TEST_DATABASE_URL"]
async fn concurrent_rotations_never_lose_an_increment() {
    let Some(store) = store().await else { return };
    let now = Utc::now();
    let refresh = refresh_issued_at(PrincipalId::new(), now);
    store.insert_pair(&access_for(&refresh, now), &refresh).await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let access = access_for(&refresh, now);
            tokio::spawn(async move { store.record_rotation(refresh.id, &access, now).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }

    let current = store.find_refresh(refresh.id).await.unwrap().unwrap();
    assert_eq!(current.usage_count, 16);
}

#[tokio::test]
#[ignore = "needs CREDO_TEST_DATABASE_URL"]
async fn purge_removes_old_terminal_rows_and_keeps_active_ones() {
    let Some(store) = store().await else { return };
    let now = Utc::now();
    let principal_id = PrincipalId::new();

    let old_refresh = refresh_issued_at(principal_id, now - Duration::days(60));
    let old_access = access_for(&old_refresh, now - Duration::days(60));
    store.insert_pair(&old_access, &old_refresh).await.unwrap();
    store.revoke_access(old_access.id).await.unwrap();

    // Same age, but still active: never deleted.
    let ancient_refresh = refresh_issued_at(principal_id, now - Duration::days(60));
    let ancient_access = access_for(&ancient_refresh, now - Duration::days(60));
    store.insert_pair(&ancient_access, &ancient_refresh).await.unwrap();

    let fresh_refresh = refresh_issued_at(principal_id, now);
    let fresh_access = access_for(&fresh_refresh, now);
    store.insert_pair(&fresh_access, &fresh_refresh).await.unwrap();
    store.revoke_access(fresh_access.id).await.unwrap();

    let report = store.purge_terminal(now - Duration::days(30)).await.unwrap();
    assert!(report.access >= 1);
    assert!(report.refresh >= 2);

    assert!(store.find_access_by_value(&old_access.value).await.unwrap().is_none());
    assert!(store.find_refresh(old_refresh.id).await.unwrap().is_none());
    assert!(store.find_access_by_value(&ancient_access.value).await.unwrap().is_some());
    assert!(store.find_access_by_value(&fresh_access.value).await.unwrap().is_some());
    assert!(store.find_refresh(fresh_refresh.id).await.unwrap().is_some());

    // The lapsed active row is flipped, then a later purge can take it.
    assert!(store.expire_lapsed_access(now).await.unwrap() >= 1);
    let lapsed = store
        .find_access_by_value(&ancient_access.value)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lapsed.status, CredentialStatus::Expired);
}

#[tokio::test]
#[ignore = "needs CREDO_TEST_DATABASE_URL"]
async fn stats_ignore_revoked_refresh_activity() {
    let Some(store) = store().await else { return };
    let now = Utc::now();
    let principal_id = PrincipalId::new();
    let refresh = refresh_issued_at(principal_id, now);
    store.insert_pair(&access_for(&refresh, now), &refresh).await.unwrap();
    store
        .record_rotation(refresh.id, &access_for(&refresh, now), now)
        .await
        .unwrap();

    let since = now - Duration::days(1);
    let before = store.session_stats(principal_id, now, since).await.unwrap();
    assert_eq!(before.active_access, 2);
    assert_eq!(before.valid_refresh, 1);
    assert_eq!(before.recently_used_refresh, 1);

    let revoked = store.revoke_all_for_principal(principal_id).await.unwrap();
    assert_eq!(revoked.total(), 3);

    let after = store.session_stats(principal_id, now, since).await.unwrap();
    assert_eq!(after.active_access, 0);
    assert_eq!(after.valid_refresh, 0);
    assert_eq!(after.recently_used_refresh, 0);
}
