//! Postgres-backed identity store over the `principals` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use credo_auth::{Principal, PrincipalAccount, PrincipalId, Role};

use super::PrincipalStore;
use crate::db::map_sqlx_error;
use crate::StoreError;

const SCHEMA: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS principals (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('reader', 'editor', 'admin')),
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#];

#[derive(Debug, Clone)]
pub struct PostgresPrincipalStore {
    pool: Arc<PgPool>,
}

impl PostgresPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_principal_schema", e))?;
        }
        Ok(())
    }

    /// Insert or replace an account keyed by username (dev seeding).
    #[instrument(skip(self, account), fields(username = %account.username), err)]
    pub async fn upsert(&self, account: &PrincipalAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO principals (id, username, email, password_hash, role, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (username) DO UPDATE
            SET email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                active = EXCLUDED.active
            "#,
        )
        .bind(account.principal.id.as_uuid())
        .bind(&account.username)
        .bind(account.email.as_deref())
        .bind(&account.password_hash)
        .bind(account.principal.role.as_str())
        .bind(account.principal.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_principal", e))?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for PostgresPrincipalStore {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query("SELECT id, role, active FROM principals WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_principal", e))?;

        row.map(|row| principal_from_row(&row)).transpose()
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalAccount>, StoreError> {
        // Username match wins over an email match on a different row.
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role, active
            FROM principals
            WHERE username = $1 OR email = $1
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_principal_by_login", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(PrincipalAccount {
            principal: principal_from_row(&row)?,
            username: row
                .try_get("username")
                .map_err(|e| StoreError::Corrupt(format!("failed to read username: {e}")))?,
            email: row
                .try_get("email")
                .map_err(|e| StoreError::Corrupt(format!("failed to read email: {e}")))?,
            password_hash: row
                .try_get("password_hash")
                .map_err(|e| StoreError::Corrupt(format!("failed to read password_hash: {e}")))?,
        }))
    }
}

fn principal_from_row(row: &sqlx::postgres::PgRow) -> Result<Principal, StoreError> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::Corrupt(format!("failed to read id: {e}")))?;
    let role: String = row
        .try_get("role")
        .map_err(|e| StoreError::Corrupt(format!("failed to read role: {e}")))?;
    let active: bool = row
        .try_get("active")
        .map_err(|e| StoreError::Corrupt(format!("failed to read active: {e}")))?;

    Ok(Principal {
        id: PrincipalId::from_uuid(id),
        role: role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        active,
    })
}
