use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const DEFAULT_OUTBOUND_BUFFER: usize = 64;
const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Server settings, read from `CLIPRELAY_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Per-connection outbound queue capacity
    pub outbound_buffer: usize,
    /// Largest inbound WebSocket message the transport accepts
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            db_path: "cliprelay.db".into(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take defaults; set but
    /// unparseable values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("CLIPRELAY_HOST").unwrap_or(defaults.host);
        let port = parse_or(&lookup, "CLIPRELAY_PORT", defaults.port)?;
        let db_path = lookup("CLIPRELAY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let outbound_buffer = parse_or(&lookup, "CLIPRELAY_OUTBOUND_BUFFER", defaults.outbound_buffer)?;
        let max_message_bytes =
            parse_or(&lookup, "CLIPRELAY_MAX_MESSAGE_BYTES", defaults.max_message_bytes)?;

        if outbound_buffer == 0 {
            bail!("CLIPRELAY_OUTBOUND_BUFFER must be greater than zero");
        }

        Ok(Self {
            host,
            port,
            db_path,
            outbound_buffer,
            max_message_bytes,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr().unwrap().port(), 5000);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CLIPRELAY_HOST", "127.0.0.1"),
            ("CLIPRELAY_PORT", "8080"),
            ("CLIPRELAY_DB_PATH", "/tmp/clips.db"),
            ("CLIPRELAY_OUTBOUND_BUFFER", "8"),
            ("CLIPRELAY_MAX_MESSAGE_BYTES", "4096"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("/tmp/clips.db"));
        assert_eq!(config.outbound_buffer, 8);
        assert_eq!(config.max_message_bytes, 4096);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("CLIPRELAY_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CLIPRELAY_PORT", "70000")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CLIPRELAY_OUTBOUND_BUFFER", "0")])).is_err());
    }
}
