// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use crate::auth::{RESET_TOKEN_TTL, SESSION_TTL};
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path for the account store
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Reset token TTL in seconds
    pub reset_token_ttl_secs: u64,
    /// Upper bound on a single notifier call, in seconds
    pub notify_timeout_secs: u64,
    /// SMTP relay settings; when absent, outbound mail is logged instead
    pub smtp: Option<SmtpSettings>,
}

/// Credentials and addressing for the SMTP notifier.
/// The relay is assumed to sit on a trusted network; transport
/// encryption is the deployment's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    /// Relay host, e.g. `smtp.internal`
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Relay username
    pub username: String,
    /// Relay password
    pub password: String,
    /// From address for outbound mail
    pub from: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().expect("static addr"),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session_ttl_secs: SESSION_TTL.as_secs(),
            reset_token_ttl_secs: RESET_TOKEN_TTL.as_secs(),
            notify_timeout_secs: 10,
            smtp: None,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and `ACCOUNTS_`-prefixed
    /// environment variables, on top of the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings with an explicit config file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ACCOUNTS_"))
            .extract()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        // defaults come straight from the auth-layer constants
        assert_eq!(settings.session_ttl_secs, SESSION_TTL.as_secs());
        assert_eq!(settings.session_ttl_secs, 60 * 60 * 24 * 7);
        assert_eq!(settings.reset_token_ttl_secs, RESET_TOKEN_TTL.as_secs());
        assert_eq!(settings.reset_token_ttl_secs, 60 * 60);
        assert!(settings.smtp.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("does-not-exist.toml").unwrap();
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        writeln!(file, "reset_token_ttl_secs = 120").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.reset_token_ttl_secs, 120);
        // untouched keys keep their defaults
        assert_eq!(settings.session_ttl_secs, 60 * 60 * 24 * 7);
    }
}
