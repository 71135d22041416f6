//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `LINGUA_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `LINGUA_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database_url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `LINGUA_AUTH__ALLOW_REGISTRATION=false` sets the `auth.allow_registration` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use lingua_auth::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LINGUA_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection string
    pub database_url: String,
    /// Email address for the initial admin account (provisioned on startup)
    pub admin_email: String,
    /// Password for the initial admin account (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for signing session tokens (required)
    pub secret_key: Option<String>,
    /// Authentication configuration (sessions, password rules, registration)
    pub auth: AuthConfig,
    /// Page-view analytics configuration
    pub analytics: AnalyticsConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "postgres://localhost:5432/lingua_auth".to_string(),
            admin_email: "admin@localhost".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
            analytics: AnalyticsConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Allow new users to self-register
    pub allow_registration: bool,
    /// Password validation rules and hashing cost
    pub password: PasswordConfig,
    /// User session cookie configuration
    pub user_session: SessionConfig,
    /// Admin session cookie configuration
    pub admin_session: SessionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_registration: true,
            password: PasswordConfig::default(),
            user_session: SessionConfig {
                timeout: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
                cookie_name: "auth-token".to_string(),
                cookie_secure: false,
                cookie_same_site: "lax".to_string(),
            },
            admin_session: SessionConfig {
                timeout: Duration::from_secs(24 * 60 * 60), // 1 day
                cookie_name: "admin-auth-token".to_string(),
                cookie_secure: false,
                cookie_same_site: "lax".to_string(),
            },
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session timeout duration
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Cookie name for session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(24 * 60 * 60),
            cookie_name: "auth-token".to_string(),
            cookie_secure: false,
            cookie_same_site: "lax".to_string(),
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 64,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// Page-view analytics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Record page-view events for trackable pages
    pub enabled: bool,
    /// Cookie name for the anonymous visitor identifier
    pub visitor_cookie_name: String,
    /// Set Secure flag on the visitor cookie (HTTPS only)
    pub visitor_cookie_secure: bool,
    /// Lifetime of the anonymous visitor cookie
    #[serde(with = "humantime_serde")]
    pub visitor_cookie_max_age: Duration,
    /// Pages whose views are recorded. "/" matches exactly; other entries
    /// match the path itself and any sub-path.
    pub trackable_pages: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visitor_cookie_name: "session-id".to_string(),
            visitor_cookie_secure: false,
            visitor_cookie_max_age: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            trackable_pages: ["/", "/dashboard", "/stories", "/flashcards", "/chat", "/signin", "/signup"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<String>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
            allow_credentials: true,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over anything in the file
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("LINGUA_").split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                 Please set LINGUA_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        if self.auth.password.min_length > self.auth.password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    self.auth.password.min_length, self.auth.password.max_length
                ),
            });
        }

        if self.auth.password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        for session in [&self.auth.user_session, &self.auth.admin_session] {
            if session.timeout.as_secs() < 300 {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: session timeout for cookie '{}' is too short (minimum 5 minutes)",
                        session.cookie_name
                    ),
                });
            }
            if session.timeout.as_secs() > 86400 * 30 {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: session timeout for cookie '{}' is too long (maximum 30 days)",
                        session.cookie_name
                    ),
                });
            }
        }

        if self.auth.user_session.cookie_name == self.auth.admin_session.cookie_name {
            return Err(Error::Internal {
                operation: "Config validation: user and admin sessions cannot share a cookie name".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_requires_secret_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config() {
        let config = Config {
            secret_key: Some("test-secret".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_password_bounds_validation() {
        let mut config = Config {
            secret_key: Some("test-secret".to_string()),
            ..Default::default()
        };
        config.auth.password.min_length = 100;
        config.auth.password.max_length = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cookie_names_must_differ() {
        let mut config = Config {
            secret_key: Some("test-secret".to_string()),
            ..Default::default()
        };
        config.auth.admin_session.cookie_name = config.auth.user_session.cookie_name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_timeout_bounds() {
        let mut config = Config {
            secret_key: Some("test-secret".to_string()),
            ..Default::default()
        };
        config.auth.user_session.timeout = Duration::from_secs(10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 3000\nsecret_key: file-secret\n")?;
            jail.set_env("LINGUA_PORT", "8080");
            jail.set_env("LINGUA_AUTH__ALLOW_REGISTRATION", "false");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 8080);
            assert!(!config.auth.allow_registration);
            assert_eq!(config.secret_key.as_deref(), Some("file-secret"));
            Ok(())
        });
    }
}
