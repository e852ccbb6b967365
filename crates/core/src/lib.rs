//! `credo-core`: shared identifiers and the domain error model.
//!
//! This crate has no infrastructure concerns; `credo-auth` re-exports its ids.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AccessCredentialId, PrincipalId, RefreshCredentialId};
