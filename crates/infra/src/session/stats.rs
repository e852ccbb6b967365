use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use credo_auth::{PrincipalId, SessionStats, SessionSummary, StorageUnavailable};

use crate::credential_store::CredentialStore;

/// Read-only views over a principal's sessions.
#[derive(Clone)]
pub struct SessionInspector {
    credentials: Arc<dyn CredentialStore>,
    recent_usage_window: Duration,
}

impl SessionInspector {
    pub(crate) fn new(credentials: Arc<dyn CredentialStore>, recent_usage_window: Duration) -> Self {
        Self {
            credentials,
            recent_usage_window,
        }
    }

    pub async fn stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<SessionStats, StorageUnavailable> {
        Ok(self
            .credentials
            .session_stats(principal_id, now, now - self.recent_usage_window)
            .await?)
    }

    /// Refresh credentials, most recently used first. Values are never included.
    pub async fn list(&self, principal_id: PrincipalId) -> Result<Vec<SessionSummary>, StorageUnavailable> {
        let sessions = self
            .credentials
            .list_refresh_for_principal(principal_id)
            .await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }
}
