use std::sync::Arc;

use anyhow::Context;

use credo_auth::{
    AccessTokenCodec, Argon2PasswordVerifier, Hs256JwtCodec, PasswordVerifier, Principal,
    PrincipalAccount, PrincipalId, Role, hash_password,
};
use credo_infra::{
    CredentialConfig, CredentialStore, InMemoryCredentialStore, InMemoryPrincipalStore,
    PostgresCredentialStore, PostgresPrincipalStore, PrincipalStore, RetentionSweeper,
    SessionManager, db,
};

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Process-level settings that are not part of the credential lifecycle.
#[derive(Clone)]
pub struct ServerSettings {
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Set when `USE_PERSISTENT_STORES=true`.
    pub database_url: Option<String>,
    pub dev_password: Option<String>,
}

impl ServerSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let use_persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| v.trim().parse::<bool>().unwrap_or(false))
            .unwrap_or(false);

        let database_url = if use_persistent {
            Some(lookup("DATABASE_URL").context(
                "DATABASE_URL must be set when USE_PERSISTENT_STORES=true",
            )?)
        } else {
            None
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            database_url,
            dev_password: lookup("CREDO_DEV_PASSWORD").filter(|p| !p.is_empty()),
        })
    }
}

impl core::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind_addr", &self.bind_addr)
            .field("persistent", &self.database_url.is_some())
            .field("dev_accounts", &self.dev_password.is_some())
            .finish_non_exhaustive()
    }
}

/// Everything the HTTP layer needs, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: SessionManager,
    pub sweeper: RetentionSweeper,
}

impl AppServices {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        principals: Arc<dyn PrincipalStore>,
        passwords: Arc<dyn PasswordVerifier>,
        codec: Arc<dyn AccessTokenCodec>,
        config: CredentialConfig,
    ) -> Self {
        let sweeper = RetentionSweeper::new(credentials.clone(), config.retention);
        let sessions = SessionManager::new(credentials, principals, passwords, codec, config);
        Self { sessions, sweeper }
    }

    /// In-memory wiring (dev/test). The principal store is returned so callers
    /// can provision accounts.
    pub fn in_memory(
        jwt_secret: &str,
        config: CredentialConfig,
    ) -> (Self, Arc<InMemoryPrincipalStore>) {
        let principals = Arc::new(InMemoryPrincipalStore::new());
        let services = Self::new(
            Arc::new(InMemoryCredentialStore::new()),
            principals.clone(),
            Arc::new(Argon2PasswordVerifier::new()),
            Arc::new(Hs256JwtCodec::new(jwt_secret)),
            config,
        );
        (services, principals)
    }
}

pub async fn build_services(
    settings: &ServerSettings,
    config: CredentialConfig,
) -> anyhow::Result<AppServices> {
    match &settings.database_url {
        Some(database_url) => build_persistent_services(settings, database_url, config).await,
        None => build_in_memory_services(settings, config),
    }
}

fn build_in_memory_services(
    settings: &ServerSettings,
    config: CredentialConfig,
) -> anyhow::Result<AppServices> {
    let (services, principals) = AppServices::in_memory(&settings.jwt_secret, config);

    match &settings.dev_password {
        Some(password) => {
            for account in dev_accounts(password)? {
                principals
                    .insert(account)
                    .context("failed to seed dev account")?;
            }
            tracing::info!("seeded dev accounts: reader, editor, admin");
        }
        None => tracing::warn!("in-memory stores without CREDO_DEV_PASSWORD; nobody can log in"),
    }

    Ok(services)
}

async fn build_persistent_services(
    settings: &ServerSettings,
    database_url: &str,
    config: CredentialConfig,
) -> anyhow::Result<AppServices> {
    let pool = db::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let credentials = PostgresCredentialStore::new(pool.clone());
    credentials
        .ensure_schema()
        .await
        .context("failed to create credential schema")?;

    let principals = PostgresPrincipalStore::new(pool);
    principals
        .ensure_schema()
        .await
        .context("failed to create principal schema")?;

    if let Some(password) = &settings.dev_password {
        for account in dev_accounts(password)? {
            principals
                .upsert(&account)
                .await
                .context("failed to seed dev account")?;
        }
        tracing::info!("upserted dev accounts: reader, editor, admin");
    }

    Ok(AppServices::new(
        Arc::new(credentials),
        Arc::new(principals),
        Arc::new(Argon2PasswordVerifier::new()),
        Arc::new(Hs256JwtCodec::new(&settings.jwt_secret)),
        config,
    ))
}

/// One account per role, all sharing the given password.
pub fn dev_accounts(password: &str) -> anyhow::Result<Vec<PrincipalAccount>> {
    let password_hash = hash_password(password).context("failed to hash dev password")?;

    Ok(Role::ALL
        .into_iter()
        .map(|role| PrincipalAccount {
            principal: Principal::new(PrincipalId::new(), role),
            username: role.as_str().to_string(),
            email: Some(format!("{}@credo.local", role.as_str())),
            password_hash: password_hash.clone(),
        })
        .collect())
}
