use std::env;

use crate::error::EngineError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub capabilities: CapabilityConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub engine: EngineConfig,
}

/// Endpoints for the three external capabilities.
///
/// A single API key covers all of them; the URLs may point at different
/// services or at one gateway.
#[derive(Debug, Clone)]
pub struct CapabilityConfig {
    pub api_key: String,
    pub generation_url: String,
    pub evaluation_url: String,
    pub retrieval_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

/// Search engine tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// UCT exploration constant, sqrt(2) unless overridden.
    pub exploration_constant: f64,
    /// Iterations for an autonomous exploration run when the caller does
    /// not ask for a specific count.
    pub default_iterations: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, EngineError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let capabilities = CapabilityConfig {
            api_key: env::var("IRIS_API_KEY").map_err(|_| EngineError::Config {
                message: "IRIS_API_KEY is required".to_string(),
            })?,
            generation_url: env::var("GENERATION_BASE_URL")
                .unwrap_or_else(|_| "https://api.iris-ideation.dev".to_string()),
            evaluation_url: env::var("EVALUATION_BASE_URL")
                .unwrap_or_else(|_| "https://api.iris-ideation.dev".to_string()),
            retrieval_url: env::var("RETRIEVAL_BASE_URL")
                .unwrap_or_else(|_| "https://api.iris-ideation.dev".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        let engine = EngineConfig {
            exploration_constant: env::var("EXPLORATION_CONSTANT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(std::f64::consts::SQRT_2),
            default_iterations: env::var("EXPLORATION_ITERATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        Ok(Config {
            capabilities,
            logging,
            request,
            engine,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            default_iterations: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_default() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_ms, 30000);
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!((config.exploration_constant - std::f64::consts::SQRT_2).abs() < 1e-9);
        assert_eq!(config.default_iterations, 5);
    }
}
