//! Environment-driven configuration for the relay binaries.
//!
//! There are no command-line flags; the server reads `CHAT_PORT` and the
//! client reads `CHAT_ADDR`, each with a sensible default when the variable
//! is unset or empty.

use anyhow::{Context, Result};

/// Environment variable naming the port the server listens on.
pub const PORT_ENV: &str = "CHAT_PORT";
/// Environment variable naming the address the client dials.
pub const ADDR_ENV: &str = "CHAT_ADDR";

pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_ADDR: &str = "localhost:1234";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    /// Reads `CHAT_PORT`. A value that does not parse as a port is a
    /// startup error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(PORT_ENV).ok();
        Self::from_port_var(raw.as_deref())
    }

    fn from_port_var(raw: Option<&str>) -> Result<Self> {
        let port = match raw.filter(|value| !value.is_empty()) {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid {PORT_ENV} value '{value}'"))?,
            None => DEFAULT_PORT,
        };
        Ok(Self { port })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub addr: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let raw = std::env::var(ADDR_ENV).ok();
        Self::from_addr_var(raw.as_deref())
    }

    fn from_addr_var(raw: Option<&str>) -> Self {
        let addr = match raw.filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => DEFAULT_ADDR.to_string(),
        };
        Self { addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset_or_empty() {
        assert_eq!(ServerConfig::from_port_var(None).unwrap().port, DEFAULT_PORT);
        assert_eq!(
            ServerConfig::from_port_var(Some("")).unwrap().port,
            DEFAULT_PORT
        );
    }

    #[test]
    fn port_override_is_parsed() {
        assert_eq!(ServerConfig::from_port_var(Some("9000")).unwrap().port, 9000);
        assert_eq!(ServerConfig::from_port_var(Some("0")).unwrap().port, 0);
    }

    #[test]
    fn unparsable_port_is_an_error() {
        assert!(ServerConfig::from_port_var(Some("not-a-port")).is_err());
        assert!(ServerConfig::from_port_var(Some("70000")).is_err());
    }

    #[test]
    fn addr_defaults_when_unset_or_empty() {
        assert_eq!(ClientConfig::from_addr_var(None).addr, DEFAULT_ADDR);
        assert_eq!(ClientConfig::from_addr_var(Some("")).addr, DEFAULT_ADDR);
    }

    #[test]
    fn addr_override_is_taken_verbatim() {
        assert_eq!(
            ClientConfig::from_addr_var(Some("10.0.0.5:4321")).addr,
            "10.0.0.5:4321"
        );
    }
}
