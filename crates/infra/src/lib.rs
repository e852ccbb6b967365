//! Infrastructure layer: credential and principal stores, configuration,
//! session services and the retention sweeper.

pub mod config;
pub mod credential_store;
pub mod db;
pub mod error;
pub mod principal_store;
pub mod session;
pub mod workers;

pub use config::{ConfigError, CredentialConfig};
pub use credential_store::{
    CredentialStore, InMemoryCredentialStore, PostgresCredentialStore, PurgeReport, RevokedCount,
};
pub use error::StoreError;
pub use principal_store::{InMemoryPrincipalStore, PostgresPrincipalStore, PrincipalStore};
pub use session::{
    CredentialIssuer, CredentialValidator, IssuedSession, RevocationManager, RevocationReason,
    RotatedAccess, RotationEngine, SessionInspector, SessionManager, ValidatedAccess,
};
pub use workers::{RetentionSweeper, SweepReport, SweeperHandle};
