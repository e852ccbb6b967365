use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};

use credo_auth::{
    AccessClaims, AccessCredentialId, AccessTokenCodec, AuthFailure, CapabilityDenied,
    Hs256JwtCodec, Origin, PasswordVerifier, Principal, PrincipalAccount, PrincipalId,
    RefreshFailure, Role, SessionStats, ValidationFailure,
};

use super::*;
use crate::{CredentialConfig, InMemoryCredentialStore, InMemoryPrincipalStore};

const SECRET: &str = "session-tests-secret";

/// Compares plaintext to the stored "hash" directly; keeps tests fast.
struct PlainVerifier;

impl PasswordVerifier for PlainVerifier {
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        plaintext == stored_hash
    }
}

struct Harness {
    sessions: SessionManager,
    credentials: Arc<InMemoryCredentialStore>,
    principals: Arc<InMemoryPrincipalStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(CredentialConfig {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            ..CredentialConfig::default()
        })
    }

    fn with_config(config: CredentialConfig) -> Self {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let principals = Arc::new(InMemoryPrincipalStore::new());
        let sessions = SessionManager::new(
            credentials.clone(),
            principals.clone(),
            Arc::new(PlainVerifier),
            Arc::new(Hs256JwtCodec::new(SECRET)),
            config,
        );
        Self {
            sessions,
            credentials,
            principals,
        }
    }

    fn add(&self, username: &str, password: &str, role: Role) -> PrincipalId {
        let principal = Principal::new(PrincipalId::new(), role);
        self.principals
            .insert(PrincipalAccount {
                principal,
                username: username.to_string(),
                email: Some(format!("{username}@example.com")),
                password_hash: password.to_string(),
            })
            .unwrap();
        principal.id
    }
}

fn origin() -> Origin {
    Origin::new(Some("203.0.113.7".to_string()), Some("tests/1.0".to_string()))
}

#[tokio::test]
async fn login_output_is_immediately_usable() {
    let h = Harness::new();
    let id = h.add("alice", "pw", Role::Editor);
    let now = Utc::now();

    let issued = h.sessions.login("alice", "pw", &origin(), now).await.unwrap();
    assert_eq!(issued.principal_id, id);
    assert!(issued.access_expires_at < issued.refresh_expires_at);

    let validated = h.sessions.validate_access(&issued.access_value, now).await.unwrap();
    assert_eq!(validated.principal_id, id);
    assert_eq!(validated.role, Role::Editor);

    let rotated = h
        .sessions
        .refresh(&issued.refresh_value, &origin(), now)
        .await
        .unwrap();
    assert_eq!(rotated.principal_id, id);
    assert_eq!(rotated.usage_count, 1);

    let again = h.sessions.validate_access(&rotated.access_value, now).await.unwrap();
    assert_eq!(again.principal_id, id);
}

#[tokio::test]
async fn login_accepts_email_and_records_origin() {
    let h = Harness::new();
    let id = h.add("bob", "pw", Role::Reader);
    let issued = h
        .sessions
        .login("bob@example.com", "pw", &origin(), Utc::now())
        .await
        .unwrap();
    assert_eq!(issued.principal_id, id);

    let stored = h
        .credentials
        .find_access_by_value(&issued.access_value)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.origin, origin());
}

#[tokio::test]
async fn login_failures_are_specific_internally() {
    let h = Harness::new();
    let id = h.add("carol", "pw", Role::Reader);
    let now = Utc::now();

    let cases = [("nobody", "pw"), ("carol", "wrong"), ("", "pw"), ("carol", "")];
    for (login, password) in cases {
        let err = h.sessions.login(login, password, &origin(), now).await.unwrap_err();
        assert_eq!(err, AuthFailure::InvalidCredentials, "{login}/{password}");
    }

    h.principals.set_active(id, false).unwrap();
    let err = h.sessions.login("carol", "pw", &origin(), now).await.unwrap_err();
    assert_eq!(err, AuthFailure::PrincipalInactive);
    assert_eq!(err.public_message(), "invalid credentials");

    // Without the right password an inactive account looks like any other miss.
    let err = h.sessions.login("carol", "nope", &origin(), now).await.unwrap_err();
    assert_eq!(err, AuthFailure::InvalidCredentials);
    assert_eq!(h.credentials.row_counts().unwrap(), (0, 0));
}

/// Counts every password check, found account or not.
#[derive(Default)]
struct CountingVerifier {
    checks: AtomicUsize,
}

impl PasswordVerifier for CountingVerifier {
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        plaintext == stored_hash
    }

    fn verify_missing(&self, _plaintext: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        false
    }
}

#[tokio::test]
async fn unknown_login_costs_a_password_check_too() {
    let principals = Arc::new(InMemoryPrincipalStore::new());
    let verifier = Arc::new(CountingVerifier::default());
    let sessions = SessionManager::new(
        Arc::new(InMemoryCredentialStore::new()),
        principals.clone(),
        verifier.clone(),
        Arc::new(Hs256JwtCodec::new(SECRET)),
        CredentialConfig::default(),
    );
    principals
        .insert(PrincipalAccount {
            principal: Principal::new(PrincipalId::new(), Role::Reader),
            username: "known".to_string(),
            email: None,
            password_hash: "pw".to_string(),
        })
        .unwrap();
    let now = Utc::now();

    let wrong = sessions.login("known", "nope", &origin(), now).await.unwrap_err();
    assert_eq!(verifier.checks.load(Ordering::SeqCst), 1);

    let missing = sessions.login("unknown", "nope", &origin(), now).await.unwrap_err();
    assert_eq!(verifier.checks.load(Ordering::SeqCst), 2);
    assert_eq!(wrong, missing);
}

#[tokio::test]
async fn validation_holds_until_expiry_then_fails_idempotently() {
    let h = Harness::new();
    h.add("dave", "pw", Role::Reader);
    let now = Utc::now();
    let issued = h.sessions.login("dave", "pw", &origin(), now).await.unwrap();

    let just_before = now + Duration::minutes(14);
    assert!(h.sessions.validate_access(&issued.access_value, just_before).await.is_ok());

    let after = now + Duration::minutes(16);
    for _ in 0..2 {
        let err = h.sessions.validate_access(&issued.access_value, after).await.unwrap_err();
        assert_eq!(err, ValidationFailure::ExpiredCredential);
    }
}

#[tokio::test]
async fn revoke_all_invalidates_before_embedded_expiry() {
    let h = Harness::new();
    let id = h.add("erin", "pw", Role::Admin);
    let now = Utc::now();
    let first = h.sessions.login("erin", "pw", &origin(), now).await.unwrap();
    let second = h.sessions.login("erin", "pw", &origin(), now).await.unwrap();

    let count = h
        .sessions
        .revoke_all_sessions(id, RevocationReason::LogoutEverywhere)
        .await
        .unwrap();
    assert_eq!(count, RevokedCount { access: 2, refresh: 2 });

    for issued in [&first, &second] {
        let err = h.sessions.validate_access(&issued.access_value, now).await.unwrap_err();
        assert_eq!(err, ValidationFailure::RevokedCredential);
        let err = h
            .sessions
            .refresh(&issued.refresh_value, &origin(), now)
            .await
            .unwrap_err();
        assert_eq!(err, RefreshFailure::RevokedRefresh);
    }

    let again = h
        .sessions
        .revoke_all_sessions(id, RevocationReason::LogoutEverywhere)
        .await
        .unwrap();
    assert_eq!(again.total(), 0);
}

#[tokio::test]
async fn refresh_on_terminal_credentials_never_mints() {
    let h = Harness::new();
    h.add("frank", "pw", Role::Reader);
    let now = Utc::now();
    let issued = h.sessions.login("frank", "pw", &origin(), now).await.unwrap();

    let expired_at = now + Duration::days(7);
    let err = h
        .sessions
        .refresh(&issued.refresh_value, &origin(), expired_at)
        .await
        .unwrap_err();
    assert_eq!(err, RefreshFailure::ExpiredRefresh);

    h.sessions
        .revoke_session(&issued.access_value, Some(&issued.refresh_value))
        .await
        .unwrap();
    let err = h
        .sessions
        .refresh(&issued.refresh_value, &origin(), now)
        .await
        .unwrap_err();
    assert_eq!(err, RefreshFailure::RevokedRefresh);

    let err = h.sessions.refresh("not-a-refresh", &origin(), now).await.unwrap_err();
    assert_eq!(err, RefreshFailure::InvalidRefresh);
    assert_eq!(err.public_message(), "invalid credentials");

    // Only the login pair exists.
    assert_eq!(h.credentials.row_counts().unwrap(), (1, 1));
}

#[tokio::test]
async fn concurrent_rotations_never_lose_a_count() {
    let h = Harness::new();
    h.add("gina", "pw", Role::Reader);
    let now = Utc::now();
    let issued = h.sessions.login("gina", "pw", &origin(), now).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let sessions = h.sessions.clone();
        let value = issued.refresh_value.clone();
        tasks.push(tokio::spawn(async move {
            sessions.refresh(&value, &Origin::default(), now).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 32);

    let refresh = h
        .credentials
        .find_refresh_by_value(&issued.refresh_value)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refresh.usage_count, successes);
    assert_eq!(h.credentials.row_counts().unwrap(), (33, 1));
}

#[tokio::test]
async fn rotation_for_inactive_principal_revokes_the_refresh() {
    let h = Harness::new();
    let id = h.add("hank", "pw", Role::Editor);
    let now = Utc::now();
    let issued = h.sessions.login("hank", "pw", &origin(), now).await.unwrap();

    h.principals.set_active(id, false).unwrap();
    let err = h
        .sessions
        .refresh(&issued.refresh_value, &origin(), now)
        .await
        .unwrap_err();
    assert_eq!(err, RefreshFailure::PrincipalInactive);

    // Reactivation does not bring the refresh credential back.
    h.principals.set_active(id, true).unwrap();
    let err = h
        .sessions
        .refresh(&issued.refresh_value, &origin(), now)
        .await
        .unwrap_err();
    assert_eq!(err, RefreshFailure::RevokedRefresh);
}

#[tokio::test]
async fn validation_reads_current_principal_state() {
    let h = Harness::new();
    let id = h.add("iris", "pw", Role::Admin);
    let now = Utc::now();
    let issued = h.sessions.login("iris", "pw", &origin(), now).await.unwrap();

    h.principals.set_role(id, Role::Reader).unwrap();
    let validated = h.sessions.validate_access(&issued.access_value, now).await.unwrap();
    assert_eq!(validated.role, Role::Reader);

    h.principals.set_active(id, false).unwrap();
    let err = h.sessions.validate_access(&issued.access_value, now).await.unwrap_err();
    assert_eq!(err, ValidationFailure::PrincipalInactive);
}

#[tokio::test]
async fn malformed_and_unknown_values_are_distinguished() {
    let h = Harness::new();
    let now = Utc::now();

    for value in ["", "garbage", "a.b.c"] {
        let err = h.sessions.validate_access(value, now).await.unwrap_err();
        assert_eq!(err, ValidationFailure::MalformedCredential);
    }

    let claims = AccessClaims::new(
        PrincipalId::new(),
        Role::Admin,
        AccessCredentialId::new(),
        now,
        now + Duration::minutes(5),
    );
    let forged = Hs256JwtCodec::new("someone-elses-secret").encode(&claims).unwrap();
    let err = h.sessions.validate_access(&forged, now).await.unwrap_err();
    assert_eq!(err, ValidationFailure::MalformedCredential);

    let unknown = Hs256JwtCodec::new(SECRET).encode(&claims).unwrap();
    let err = h.sessions.validate_access(&unknown, now).await.unwrap_err();
    assert_eq!(err, ValidationFailure::UnknownCredential);

    let stale = AccessClaims::new(
        PrincipalId::new(),
        Role::Admin,
        AccessCredentialId::new(),
        now - Duration::hours(2),
        now - Duration::hours(1),
    );
    let stale = Hs256JwtCodec::new(SECRET).encode(&stale).unwrap();
    let err = h.sessions.validate_access(&stale, now).await.unwrap_err();
    assert_eq!(err, ValidationFailure::ExpiredCredential);
}

#[tokio::test]
async fn single_session_revoke_is_idempotent_and_owner_scoped() {
    let h = Harness::new();
    h.add("jack", "pw", Role::Reader);
    h.add("kate", "pw", Role::Reader);
    let now = Utc::now();
    let jack = h.sessions.login("jack", "pw", &origin(), now).await.unwrap();
    let kate = h.sessions.login("kate", "pw", &origin(), now).await.unwrap();

    // Kate's refresh value is ignored when paired with Jack's access value.
    let count = h
        .sessions
        .revoke_session(&jack.access_value, Some(&kate.refresh_value))
        .await
        .unwrap();
    assert_eq!(count, RevokedCount { access: 1, refresh: 0 });
    assert!(h.sessions.refresh(&kate.refresh_value, &origin(), now).await.is_ok());

    let count = h
        .sessions
        .revoke_session(&jack.access_value, None)
        .await
        .unwrap();
    assert_eq!(count.total(), 0);

    // Jack's refresh survives an access-only logout.
    assert!(h.sessions.refresh(&jack.refresh_value, &origin(), now).await.is_ok());

    let count = h.sessions.revoke_session("unknown", None).await.unwrap();
    assert_eq!(count.total(), 0);
}

#[tokio::test]
async fn stats_and_listing_reflect_usage() {
    let h = Harness::new();
    let id = h.add("liam", "pw", Role::Reader);
    let now = Utc::now();
    let used = h.sessions.login("liam", "pw", &origin(), now).await.unwrap();
    let idle = h.sessions.login("liam", "pw", &origin(), now).await.unwrap();
    h.sessions.refresh(&used.refresh_value, &origin(), now).await.unwrap();

    let stats = h.sessions.session_stats(id, now).await.unwrap();
    assert_eq!(stats.active_access, 3);
    assert_eq!(stats.valid_refresh, 2);
    assert_eq!(stats.recently_used_refresh, 1);

    let listed = h.sessions.list_sessions(id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].usage_count, 1);
    assert_eq!(listed[1].usage_count, 0);

    let idle_record = h
        .credentials
        .find_refresh_by_value(&idle.refresh_value)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(listed[1].refresh_id, idle_record.id);
}

#[tokio::test]
async fn revoked_sessions_do_not_count_as_recently_used() {
    let h = Harness::new();
    let id = h.add("rhea", "pw", Role::Reader);
    let now = Utc::now();
    let session = h.sessions.login("rhea", "pw", &origin(), now).await.unwrap();
    h.sessions
        .refresh(&session.refresh_value, &origin(), now)
        .await
        .unwrap();

    h.sessions
        .revoke_all_sessions(id, RevocationReason::LogoutEverywhere)
        .await
        .unwrap();

    let stats = h.sessions.session_stats(id, now).await.unwrap();
    assert_eq!(stats, SessionStats::default());
}

#[tokio::test]
async fn overuse_is_flagged_but_never_denied() {
    let h = Harness::with_config(CredentialConfig {
        access_ttl: Duration::minutes(15),
        overuse_threshold: 2,
        ..CredentialConfig::default()
    });
    h.add("mona", "pw", Role::Reader);
    let now = Utc::now();
    let issued = h.sessions.login("mona", "pw", &origin(), now).await.unwrap();

    let mut flags = Vec::new();
    for _ in 0..4 {
        let rotated = h
            .sessions
            .refresh(&issued.refresh_value, &origin(), now)
            .await
            .unwrap();
        flags.push(rotated.overused);
    }
    assert_eq!(flags, vec![false, false, true, true]);
}

#[tokio::test]
async fn gate_follows_the_role_hierarchy() {
    let h = Harness::new();
    assert_eq!(h.sessions.authorize(Role::Admin, Role::Editor), Ok(()));
    assert_eq!(h.sessions.authorize(Role::Editor, Role::Editor), Ok(()));
    assert_eq!(
        h.sessions.authorize(Role::Reader, Role::Editor),
        Err(CapabilityDenied {
            role: Role::Reader,
            required: Role::Editor
        })
    );
}

#[tokio::test]
async fn editor_scenario_end_to_end() {
    let h = Harness::new();
    let id = h.add("nina", "pw", Role::Editor);
    let now = Utc::now();
    let issued = h.sessions.login("nina", "pw", &origin(), now).await.unwrap();

    let who = h.sessions.validate_access(&issued.access_value, now).await.unwrap();
    assert!(h.sessions.authorize(who.role, Role::Reader).is_ok());
    assert!(h.sessions.authorize(who.role, Role::Admin).is_err());

    h.sessions
        .revoke_all_sessions(id, RevocationReason::LogoutEverywhere)
        .await
        .unwrap();
    let err = h.sessions.validate_access(&issued.access_value, now).await.unwrap_err();
    assert_eq!(err, ValidationFailure::RevokedCredential);
}
