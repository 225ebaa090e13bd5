//! Environment-driven configuration (§6 "Configuration"), loaded once at
//! startup and validated eagerly so misconfiguration fails fast before the
//! ingestion task spawns, per the teacher's plain `std::env::var` parsing
//! convention rather than a derive-macro config crate.

use std::str::FromStr;

use swap_ingest::Commitment;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Implementation α: bidirectional gRPC push (§4.1).
    Grpc,
    /// Implementation β: JSON-RPC-over-WebSocket push (§4.1).
    WebSocket,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grpc" => Ok(ProviderKind::Grpc),
            "websocket" | "ws" => Ok(ProviderKind::WebSocket),
            other => Err(ConfigError::InvalidValue {
                var: "SWAP_PROVIDER",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub grpc_endpoint: Option<String>,
    pub grpc_x_token: Option<String>,
    pub websocket_url: Option<String>,
    pub commitment: Commitment,
    pub enable_v0: bool,
    pub max_cache_bytes: usize,
    pub cleanup_threshold: f64,
    pub rpc_endpoint: String,
    pub aggregator_base_url: Option<String>,
    pub listen_port: u16,
}

const DEFAULT_LISTEN_PORT: u16 = 5551;
const DEFAULT_MAX_CACHE_MB: usize = 64;
const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

impl Config {
    /// Load and eagerly validate configuration from the process
    /// environment. Fails fast rather than deferring a missing endpoint
    /// to the first reconnect attempt.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = optional_var("SWAP_PROVIDER")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(ProviderKind::WebSocket);

        let grpc_endpoint = optional_var("SWAP_GRPC_ENDPOINT");
        let grpc_x_token = optional_var("SWAP_GRPC_X_TOKEN");
        let websocket_url = optional_var("SWAP_WEBSOCKET_URL");

        match provider {
            ProviderKind::Grpc if grpc_endpoint.is_none() => {
                return Err(ConfigError::Missing("SWAP_GRPC_ENDPOINT"));
            }
            ProviderKind::WebSocket if websocket_url.is_none() => {
                return Err(ConfigError::Missing("SWAP_WEBSOCKET_URL"));
            }
            _ => {}
        }

        let commitment = match optional_var("SWAP_COMMITMENT").as_deref() {
            Some("processed") => Commitment::Processed,
            Some("confirmed") | None => Commitment::Confirmed,
            Some("finalized") => Commitment::Finalized,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "SWAP_COMMITMENT",
                    value: other.to_string(),
                });
            }
        };

        let enable_v0 = parse_bool_var("SWAP_ENABLE_V0", true)?;

        let max_cache_mb = parse_usize_var("SWAP_MAX_CACHE_MB", DEFAULT_MAX_CACHE_MB)?;
        let max_cache_bytes = max_cache_mb.saturating_mul(1024 * 1024);

        let cleanup_threshold =
            parse_f64_var("SWAP_CLEANUP_THRESHOLD", swap_cache::DEFAULT_CLEANUP_THRESHOLD)?;

        let rpc_endpoint =
            optional_var("SWAP_RPC_ENDPOINT").unwrap_or_else(|| DEFAULT_RPC_ENDPOINT.to_string());

        let aggregator_base_url = optional_var("SWAP_AGGREGATOR_URL");

        let listen_port = parse_u16_var("SWAP_PORT", DEFAULT_LISTEN_PORT)?;

        Ok(Self {
            provider,
            grpc_endpoint,
            grpc_x_token,
            websocket_url,
            commitment,
            enable_v0,
            max_cache_bytes,
            cleanup_threshold,
            rpc_endpoint,
            aggregator_base_url,
            listen_port,
        })
    }
}

fn optional_var(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_bool_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(key) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue { var: key, value }),
        },
    }
}

fn parse_usize_var(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match optional_var(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var: key, value }),
    }
}

fn parse_u16_var(key: &'static str, default: u16) -> Result<u16, ConfigError> {
    match optional_var(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var: key, value }),
    }
}

fn parse_f64_var(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match optional_var(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var: key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_known_values() {
        assert_eq!("grpc".parse::<ProviderKind>().unwrap(), ProviderKind::Grpc);
        assert_eq!(
            "websocket".parse::<ProviderKind>().unwrap(),
            ProviderKind::WebSocket
        );
        assert!("carrier-pigeon".parse::<ProviderKind>().is_err());
    }
}
