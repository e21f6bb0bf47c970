use std::env;

use crate::constants::DEFAULT_SAVING_ACCESS_TTL_SECS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// Signs primary user session tokens
    pub jwt_secret: String,
    /// Signs saving access markers
    pub saving_key_secret: String,
    pub bcrypt_cost: u32,
    pub saving_access_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/bpay.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set for session tokens")?;

        let saving_key_secret = env::var("SAVING_KEY_SECRET")
            .map_err(|_| "SAVING_KEY_SECRET must be set for saving access markers")?;

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(value) => value.parse().map_err(|_| "Invalid BCRYPT_COST")?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let saving_access_ttl_secs = env::var("SAVING_ACCESS_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_SAVING_ACCESS_TTL_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid SAVING_ACCESS_TTL_SECS")?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            jwt_secret,
            saving_key_secret,
            bcrypt_cost,
            saving_access_ttl_secs,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
