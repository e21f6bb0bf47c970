//! B-Pay Server Library
//!
//! Users, PIN-protected saving accounts and their append-only transaction
//! ledgers, served over HTTP and stored in an embedded redb database.

pub mod access;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod ownership;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{Db, open_database, open_in_memory};
pub use error::{AppError, Result};
pub use routes::router;
pub use security::CredentialVerifier;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub credentials: CredentialVerifier,
}

impl AppState {
    /// Create a new AppState with the given database and configuration
    pub fn new(db: Db, config: Config) -> Result<Self> {
        let credentials = CredentialVerifier::new(config.bcrypt_cost)?;
        Ok(Self {
            db,
            config,
            credentials,
        })
    }
}
