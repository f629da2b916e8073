//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Optional Prometheus exporter bind address
    pub metrics_bind: Option<SocketAddr>,
    /// Security configuration
    pub security: SecurityConfig,
    /// Session duration in seconds; bounds both the table document TTL and
    /// the access token lifetime, so a credential never outlives its room
    pub session_duration_secs: u64,
    /// Round driver configuration
    pub round: RoundConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
}

/// Round driver settings
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    /// Milliseconds between number broadcasts
    pub tick_ms: u64,
    /// Probability that any given tick is the last one; round length is
    /// geometrically distributed and has no upper bound
    pub stop_probability: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:8090"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let metrics_bind = std::env::var("METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok());

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        let security = SecurityConfig { jwt_secret };

        let round = RoundConfig {
            tick_ms: parse_env_or("ROUND_TICK_MS", 400),
            stop_probability: parse_env_or("ROUND_STOP_PROBABILITY", 0.12),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            security,
            session_duration_secs: parse_env_or("SESSION_DURATION_SECS", 7200),
            round,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_duration_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_DURATION_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.round.tick_ms < 50 {
            return Err(ConfigError::Invalid {
                var: "ROUND_TICK_MS".to_string(),
                reason: "Must be at least 50ms to keep broadcasts readable".to_string(),
            });
        }

        if !(self.round.stop_probability > 0.0 && self.round.stop_probability <= 1.0) {
            return Err(ConfigError::Invalid {
                var: "ROUND_STOP_PROBABILITY".to_string(),
                reason: "Must be within (0, 1]; 0 would spin forever".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
