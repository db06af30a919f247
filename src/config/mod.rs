use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret for access/refresh token signatures.
    pub token_secret: String,
    pub access_token_expiry_mins: u64,
    pub refresh_token_expiry_days: u64,
    /// Where unauthenticated browser requests are redirected.
    pub login_path: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SERVER_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("SECURITY_TOKEN_SECRET") {
            self.security.token_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_EXPIRY_MINS") {
            self.security.access_token_expiry_mins =
                v.parse().unwrap_or(self.security.access_token_expiry_mins);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_EXPIRY_DAYS") {
            self.security.refresh_token_expiry_days =
                v.parse().unwrap_or(self.security.refresh_token_expiry_days);
        }
        if let Ok(v) = env::var("SECURITY_LOGIN_PATH") {
            self.security.login_path = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            security: SecurityConfig {
                token_secret: "parley-dev-secret".to_string(),
                access_token_expiry_mins: 60,
                refresh_token_expiry_days: 30,
                login_path: "/login".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://staging.parley.example.com".to_string()],
            },
            security: SecurityConfig {
                // Must be overridden via SECURITY_TOKEN_SECRET in deployment
                token_secret: String::new(),
                access_token_expiry_mins: 30,
                refresh_token_expiry_days: 14,
                login_path: "/login".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://app.parley.example.com".to_string()],
            },
            security: SecurityConfig {
                token_secret: String::new(),
                access_token_expiry_mins: 15,
                refresh_token_expiry_days: 7,
                login_path: "/login".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
