//! Access and refresh credential records.
//!
//! These are the rows the credential store persists. State changes go through
//! the methods here so the monotonic status rules live in one place.

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use credo_core::{AccessCredentialId, DomainError, RefreshCredentialId};

use crate::PrincipalId;

/// Where a credential was requested from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Origin {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}

/// Status of an access credential.
///
/// `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Revoked,
    Expired,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::Revoked => "revoked",
            CredentialStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CredentialStatus::Active)
    }
}

impl core::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CredentialStatus::Active),
            "revoked" => Ok(CredentialStatus::Revoked),
            "expired" => Ok(CredentialStatus::Expired),
            other => Err(DomainError::unknown_variant("credential status", other)),
        }
    }
}

/// Short-lived credential presented on every protected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub id: AccessCredentialId,
    /// Signed value handed to the client. Unique across the store.
    pub value: String,
    pub principal_id: PrincipalId,
    /// Refresh credential this was issued alongside or rotated from.
    pub refresh_id: Option<RefreshCredentialId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: CredentialStatus,
    pub origin: Origin,
}

impl AccessCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == CredentialStatus::Active && !self.is_expired(now)
    }

    /// Move to a terminal status. Returns `false` when already terminal (no-op).
    pub fn transition(&mut self, to: CredentialStatus) -> bool {
        if self.status.is_terminal() || !to.is_terminal() {
            return false;
        }
        self.status = to;
        true
    }

    pub fn revoke(&mut self) -> bool {
        self.transition(CredentialStatus::Revoked)
    }

    pub fn mark_expired(&mut self) -> bool {
        self.transition(CredentialStatus::Expired)
    }
}

/// Long-lived credential used only to obtain new access credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredential {
    pub id: RefreshCredentialId,
    /// Opaque random value handed to the client. Unique across the store.
    pub value: String,
    pub principal_id: PrincipalId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub origin: Origin,
}

impl RefreshCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }

    /// Revoked or past expiry: can never be used again.
    pub fn is_terminal(&self, now: DateTime<Utc>) -> bool {
        !self.is_usable(now)
    }

    /// Returns `false` when already revoked (no-op).
    pub fn revoke(&mut self) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        true
    }

    /// Record one rotation. Returns the new usage count.
    pub fn mark_used(&mut self, now: DateTime<Utc>) -> u64 {
        self.last_used_at = Some(now);
        self.usage_count += 1;
        self.usage_count
    }

    pub fn is_overused(&self, threshold: u64) -> bool {
        self.usage_count > threshold
    }

    pub fn is_recently_used(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_used_at.is_some_and(|used| used > now - window)
    }
}

/// Summary of one stored refresh credential, safe to show to its owner or an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub refresh_id: RefreshCredentialId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub origin: Origin,
}

impl From<&RefreshCredential> for SessionSummary {
    fn from(value: &RefreshCredential) -> Self {
        Self {
            refresh_id: value.id,
            issued_at: value.issued_at,
            expires_at: value.expires_at,
            revoked: value.revoked,
            last_used_at: value.last_used_at,
            usage_count: value.usage_count,
            origin: value.origin.clone(),
        }
    }
}

/// Per-principal credential counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub active_access: u64,
    pub valid_refresh: u64,
    pub recently_used_refresh: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(now: DateTime<Utc>) -> AccessCredential {
        AccessCredential {
            id: AccessCredentialId::new(),
            value: "v".to_string(),
            principal_id: PrincipalId::new(),
            refresh_id: None,
            issued_at: now,
            expires_at: now + Duration::minutes(10),
            status: CredentialStatus::Active,
            origin: Origin::default(),
        }
    }

    fn refresh(now: DateTime<Utc>) -> RefreshCredential {
        RefreshCredential {
            id: RefreshCredentialId::new(),
            value: "r".to_string(),
            principal_id: PrincipalId::new(),
            issued_at: now,
            expires_at: now + Duration::days(7),
            revoked: false,
            last_used_at: None,
            usage_count: 0,
            origin: Origin::default(),
        }
    }

    #[test]
    fn status_transitions_are_monotonic() {
        let now = Utc::now();
        let mut cred = access(now);
        assert!(cred.revoke());
        assert!(!cred.revoke());
        assert!(!cred.mark_expired());
        assert_eq!(cred.status, CredentialStatus::Revoked);

        let mut cred = access(now);
        assert!(cred.mark_expired());
        assert!(!cred.revoke());
        assert!(!cred.transition(CredentialStatus::Active));
        assert_eq!(cred.status, CredentialStatus::Expired);
    }

    #[test]
    fn access_usability_tracks_expiry_and_status() {
        let now = Utc::now();
        let cred = access(now);
        assert!(cred.is_usable(now));
        assert!(!cred.is_usable(now + Duration::minutes(10)));
    }

    #[test]
    fn refresh_usage_and_overuse() {
        let now = Utc::now();
        let mut cred = refresh(now);
        assert!(!cred.is_recently_used(now, Duration::days(1)));
        for _ in 0..101 {
            cred.mark_used(now);
        }
        assert_eq!(cred.usage_count, 101);
        assert!(cred.is_overused(100));
        assert!(!cred.is_overused(101));
        assert!(cred.is_recently_used(now + Duration::hours(1), Duration::days(1)));
        assert!(!cred.is_recently_used(now + Duration::days(2), Duration::days(1)));
    }

    #[test]
    fn refresh_revoke_is_idempotent() {
        let now = Utc::now();
        let mut cred = refresh(now);
        assert!(cred.revoke());
        assert!(!cred.revoke());
        assert!(cred.is_terminal(now));
    }

    #[test]
    fn status_parses_its_own_names() {
        for status in [CredentialStatus::Active, CredentialStatus::Revoked, CredentialStatus::Expired] {
            assert_eq!(status.as_str().parse::<CredentialStatus>().unwrap(), status);
        }
        assert!("pending".parse::<CredentialStatus>().is_err());
    }
}
