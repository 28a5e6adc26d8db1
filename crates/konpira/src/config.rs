//! Process-level server configuration.

use serde::{Deserialize, Serialize};

use crate::KonpiraError;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST` and `PORT` from the environment, falling back to the
    /// defaults for unset variables.
    ///
    /// # Errors
    /// [`KonpiraError::InvalidConfig`] if `PORT` is set but not a port number.
    pub fn from_env() -> Result<Self, KonpiraError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, KonpiraError> {
        let mut config = Self::default();
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| KonpiraError::InvalidConfig(format!("PORT={port:?} is not a port")))?;
        }
        Ok(config)
    }

    /// The `host:port` string handed to the transport.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(env(&[("HOST", "127.0.0.1"), ("PORT", "8080")])).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_bad_port() {
        let err = ServerConfig::from_lookup(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, KonpiraError::InvalidConfig(_)));
    }

    #[test]
    fn test_partial_json() {
        let config: ServerConfig = serde_json::from_str(r#"{"port":9000}"#).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
    }
}
