//! src/config.rs
//!
//! JSON bot configuration. `load_or_default` never fails: any problem reading
//! or validating the file is logged and the defaults are used instead.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use alaris_common::models::AdminEntry;

use crate::utils::NameGenerator;
use crate::Error;

pub const DEFAULT_CONFIG_FILE: &str = "alaris.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub server: String,
    pub port: u16,
    pub tls: bool,
    /// Empty means "generate one at startup".
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub password: Option<String>,
    pub channels: Vec<String>,
    pub command_prefix: String,
    pub plugin_directory: String,
    pub load_plugins: bool,
    pub admins: Vec<AdminEntry>,
    /// Base64 of a 32-byte AES-256 key. A random key is used when absent.
    pub aes_key: Option<String>,
    /// Per-command timeout; `0` disables it.
    pub command_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            server: "irc.libera.chat".to_string(),
            port: 6697,
            tls: true,
            nickname: String::new(),
            username: "alaris".to_string(),
            realname: "Alaris IRC bot".to_string(),
            password: None,
            channels: Vec::new(),
            command_prefix: "!".to_string(),
            plugin_directory: "plugins".to_string(),
            load_plugins: true,
            admins: Vec::new(),
            aes_key: None,
            command_timeout_secs: 30,
        }
    }
}

impl BotConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config: BotConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`BotConfig::load`], but logs the failure and returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found; using defaults.", path.display());
                Self::default()
            }
            Err(e) => {
                error!("Could not read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.command_prefix.is_empty() {
            return Err(Error::Config("command_prefix must not be empty".into()));
        }
        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(Error::Config("command_prefix must not contain whitespace".into()));
        }
        if self.server.trim().is_empty() {
            return Err(Error::Config("server must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".into()));
        }
        if let Some(bad) = self.channels.iter().find(|c| c.trim().is_empty() || c.contains(' ')) {
            return Err(Error::Config(format!("invalid channel name '{bad}'")));
        }
        Ok(())
    }

    /// Fills in a generated nickname when none is configured.
    pub fn ensure_nickname(&mut self) {
        if self.nickname.trim().is_empty() {
            self.nickname = NameGenerator::new().make_name();
            info!("No nickname configured; using generated nickname '{}'", self.nickname);
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
