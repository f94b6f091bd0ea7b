use std::net::SocketAddr;

use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Process configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ApiConfig {
    /// `DEPOT_BIND_ADDR` (default `0.0.0.0:8080`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup("DEPOT_BIND_ADDR") {
            match raw.trim().parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => warn!(value = %raw, "DEPOT_BIND_ADDR is not a socket address; using {DEFAULT_BIND_ADDR}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_defaults_and_overrides() {
        assert_eq!(ApiConfig::from_lookup(|_| None), ApiConfig::default());

        let config = ApiConfig::from_lookup(|_| Some("127.0.0.1:9000".to_string()));
        assert_eq!(config.bind_addr.port(), 9000);

        let config = ApiConfig::from_lookup(|_| Some("nonsense".to_string()));
        assert_eq!(config, ApiConfig::default());
    }
}
