//! Postgres-backed credential store.
//!
//! ## Atomicity
//!
//! | Operation | Mechanism |
//! |-----------|-----------|
//! | `insert_pair` | both inserts in one transaction |
//! | `record_rotation` | conditional `UPDATE .. RETURNING` takes the row lock, then the access insert, one transaction |
//! | status flips | conditional updates (`WHERE status = 'active'`, `WHERE revoked = FALSE`) |
//! | usage counter | `usage_count = usage_count + 1`, never read-modify-write in Rust |
//!
//! ## Error Mapping
//!
//! Unique violations (`23505`) map to `StoreError::Conflict`; every other
//! driver fault maps to `StoreError::Unavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use credo_auth::{
    AccessCredential, AccessCredentialId, CredentialStatus, Origin, PrincipalId,
    RefreshCredential, RefreshCredentialId, SessionStats,
};

use super::{CredentialStore, PurgeReport, RevokedCount};
use crate::db::map_sqlx_error;
use crate::StoreError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS refresh_credentials (
        id UUID PRIMARY KEY,
        value TEXT NOT NULL UNIQUE,
        principal_id UUID NOT NULL,
        issued_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        revoked BOOLEAN NOT NULL DEFAULT FALSE,
        last_used_at TIMESTAMPTZ NULL,
        usage_count BIGINT NOT NULL DEFAULT 0 CHECK (usage_count >= 0),
        origin_ip TEXT NULL,
        origin_user_agent TEXT NULL,
        CHECK (expires_at > issued_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS refresh_credentials_principal_idx ON refresh_credentials (principal_id)",
    r#"
    CREATE TABLE IF NOT EXISTS access_credentials (
        id UUID PRIMARY KEY,
        value TEXT NOT NULL UNIQUE,
        principal_id UUID NOT NULL,
        refresh_id UUID NULL,
        issued_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('active', 'revoked', 'expired')),
        origin_ip TEXT NULL,
        origin_user_agent TEXT NULL,
        CHECK (expires_at > issued_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS access_credentials_principal_idx ON access_credentials (principal_id)",
    "CREATE INDEX IF NOT EXISTS access_credentials_expires_idx ON access_credentials (status, expires_at)",
];

const ACCESS_COLUMNS: &str = "id, value, principal_id, refresh_id, issued_at, expires_at, status, origin_ip, origin_user_agent";
const REFRESH_COLUMNS: &str = "id, value, principal_id, issued_at, expires_at, revoked, last_used_at, usage_count, origin_ip, origin_user_agent";

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they do not exist. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_credential_schema", e))?;
        }
        Ok(())
    }
}

async fn insert_access<'e, E>(executor: E, access: &AccessCredential) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO access_credentials (
            id, value, principal_id, refresh_id, issued_at, expires_at, status,
            origin_ip, origin_user_agent
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(access.id.as_uuid())
    .bind(&access.value)
    .bind(access.principal_id.as_uuid())
    .bind(access.refresh_id.map(|id| *id.as_uuid()))
    .bind(access.issued_at)
    .bind(access.expires_at)
    .bind(access.status.as_str())
    .bind(access.origin.ip.as_deref())
    .bind(access.origin.user_agent.as_deref())
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_access", e))?;
    Ok(())
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip_all, fields(principal_id = %access.principal_id), err)]
    async fn insert_pair(
        &self,
        access: &AccessCredential,
        refresh: &RefreshCredential,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO refresh_credentials (
                id, value, principal_id, issued_at, expires_at, revoked,
                last_used_at, usage_count, origin_ip, origin_user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(refresh.id.as_uuid())
        .bind(&refresh.value)
        .bind(refresh.principal_id.as_uuid())
        .bind(refresh.issued_at)
        .bind(refresh.expires_at)
        .bind(refresh.revoked)
        .bind(refresh.last_used_at)
        .bind(refresh.usage_count as i64)
        .bind(refresh.origin.ip.as_deref())
        .bind(refresh.origin.user_agent.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_refresh", e))?;

        insert_access(&mut *tx, access).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessCredential>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCESS_COLUMNS} FROM access_credentials WHERE value = $1"
        ))
        .bind(value)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_access_by_value", e))?;

        row.map(|row| access_from_row(&row)).transpose()
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_credentials WHERE value = $1"
        ))
        .bind(value)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_refresh_by_value", e))?;

        row.map(|row| refresh_from_row(&row)).transpose()
    }

    async fn find_refresh(
        &self,
        id: RefreshCredentialId,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_credentials WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_refresh", e))?;

        row.map(|row| refresh_from_row(&row)).transpose()
    }

    #[instrument(skip_all, fields(refresh_id = %refresh_id), err)]
    async fn record_rotation(
        &self,
        refresh_id: RefreshCredentialId,
        access: &AccessCredential,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE refresh_credentials
            SET usage_count = usage_count + 1, last_used_at = $2
            WHERE id = $1 AND revoked = FALSE AND expires_at > $2
            RETURNING {REFRESH_COLUMNS}
            "#
        ))
        .bind(refresh_id.as_uuid())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("bump_refresh_usage", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(None);
        };
        let refresh = refresh_from_row(&row)?;

        insert_access(&mut *tx, access).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Some(refresh))
    }

    async fn revoke_access(&self, id: AccessCredentialId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE access_credentials SET status = 'revoked' WHERE id = $1 AND status = 'active'",
        )
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_access", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh(&self, id: RefreshCredentialId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_credentials SET revoked = TRUE WHERE id = $1 AND revoked = FALSE",
        )
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_refresh", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip_all, fields(principal_id = %principal_id), err)]
    async fn revoke_all_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<RevokedCount, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let access = sqlx::query(
            "UPDATE access_credentials SET status = 'revoked' WHERE principal_id = $1 AND status = 'active'",
        )
        .bind(principal_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("revoke_all_access", e))?
        .rows_affected();

        let refresh = sqlx::query(
            "UPDATE refresh_credentials SET revoked = TRUE WHERE principal_id = $1 AND revoked = FALSE",
        )
        .bind(principal_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("revoke_all_refresh", e))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(RevokedCount { access, refresh })
    }

    async fn list_refresh_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<RefreshCredential>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REFRESH_COLUMNS}
            FROM refresh_credentials
            WHERE principal_id = $1
            ORDER BY last_used_at DESC NULLS LAST, issued_at DESC
            "#
        ))
        .bind(principal_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_refresh_for_principal", e))?;

        rows.iter().map(refresh_from_row).collect()
    }

    async fn session_stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
        recently_used_since: DateTime<Utc>,
    ) -> Result<SessionStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM access_credentials
                    WHERE principal_id = $1 AND status = 'active' AND expires_at > $2) AS active_access,
                (SELECT COUNT(*) FROM refresh_credentials
                    WHERE principal_id = $1 AND revoked = FALSE AND expires_at > $2) AS valid_refresh,
                (SELECT COUNT(*) FROM refresh_credentials
                    WHERE principal_id = $1 AND revoked = FALSE AND last_used_at > $3) AS recently_used_refresh
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(now)
        .bind(recently_used_since)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("session_stats", e))?;

        let count = |column: &str| -> Result<u64, StoreError> {
            row.try_get::<i64, _>(column)
                .map(|n| n.max(0) as u64)
                .map_err(|e| StoreError::Corrupt(format!("failed to read {column}: {e}")))
        };

        Ok(SessionStats {
            active_access: count("active_access")?,
            valid_refresh: count("valid_refresh")?,
            recently_used_refresh: count("recently_used_refresh")?,
        })
    }

    #[instrument(skip(self), err)]
    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let access = sqlx::query(
            "DELETE FROM access_credentials WHERE status <> 'active' AND expires_at < $1",
        )
        .bind(cutoff)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purge_access", e))?
        .rows_affected();

        let refresh = sqlx::query(
            "DELETE FROM refresh_credentials WHERE expires_at < $1 OR (revoked = TRUE AND issued_at < $1)",
        )
        .bind(cutoff)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purge_refresh", e))?
        .rows_affected();

        Ok(PurgeReport { access, refresh })
    }

    #[instrument(skip(self), err)]
    async fn expire_lapsed_access(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE access_credentials SET status = 'expired' WHERE status = 'active' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expire_lapsed_access", e))?;
        Ok(result.rows_affected())
    }
}

fn corrupt(column: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("failed to read {column}: {err}"))
}

fn access_from_row(row: &sqlx::postgres::PgRow) -> Result<AccessCredential, StoreError> {
    let status: String = row.try_get("status").map_err(|e| corrupt("status", e))?;
    let refresh_id: Option<Uuid> = row.try_get("refresh_id").map_err(|e| corrupt("refresh_id", e))?;

    Ok(AccessCredential {
        id: AccessCredentialId::from_uuid(row.try_get("id").map_err(|e| corrupt("id", e))?),
        value: row.try_get("value").map_err(|e| corrupt("value", e))?,
        principal_id: PrincipalId::from_uuid(
            row.try_get("principal_id").map_err(|e| corrupt("principal_id", e))?,
        ),
        refresh_id: refresh_id.map(RefreshCredentialId::from_uuid),
        issued_at: row.try_get("issued_at").map_err(|e| corrupt("issued_at", e))?,
        expires_at: row.try_get("expires_at").map_err(|e| corrupt("expires_at", e))?,
        status: status
            .parse::<CredentialStatus>()
            .map_err(|e| corrupt("status", e))?,
        origin: Origin {
            ip: row.try_get("origin_ip").map_err(|e| corrupt("origin_ip", e))?,
            user_agent: row
                .try_get("origin_user_agent")
                .map_err(|e| corrupt("origin_user_agent", e))?,
        },
    })
}

fn refresh_from_row(row: &sqlx::postgres::PgRow) -> Result<RefreshCredential, StoreError> {
    let usage_count: i64 = row.try_get("usage_count").map_err(|e| corrupt("usage_count", e))?;

    Ok(RefreshCredential {
        id: RefreshCredentialId::from_uuid(row.try_get("id").map_err(|e| corrupt("id", e))?),
        value: row.try_get("value").map_err(|e| corrupt("value", e))?,
        principal_id: PrincipalId::from_uuid(
            row.try_get("principal_id").map_err(|e| corrupt("principal_id", e))?,
        ),
        issued_at: row.try_get("issued_at").map_err(|e| corrupt("issued_at", e))?,
        expires_at: row.try_get("expires_at").map_err(|e| corrupt("expires_at", e))?,
        revoked: row.try_get("revoked").map_err(|e| corrupt("revoked", e))?,
        last_used_at: row.try_get("last_used_at").map_err(|e| corrupt("last_used_at", e))?,
        usage_count: u64::try_from(usage_count).map_err(|e| corrupt("usage_count", e))?,
        origin: Origin {
            ip: row.try_get("origin_ip").map_err(|e| corrupt("origin_ip", e))?,
            user_agent: row
                .try_get("origin_user_agent")
                .map_err(|e| corrupt("origin_user_agent", e))?,
        },
    })
}
