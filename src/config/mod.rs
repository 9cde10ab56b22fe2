use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::utils::{ensure_dir, write_atomic, PathResolver},
    errors::{LedgerError, Result},
    storage::{AccountStore, JsonStorage, MemoryStorage, StorageBackend, DEFAULT_KEY_PREFIX},
};

/// Where account documents live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process memory only; nothing survives the session.
    Local,
    /// JSON files in the data directory.
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub currency: String,
    #[serde(default)]
    pub entity_name: String,
    pub entity_type: String,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            entity_name: String::new(),
            entity_type: "individual".into(),
            storage: StorageKind::default(),
            data_dir: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl Config {
    /// Opens the configured storage backend below `base`.
    pub fn open_backend(&self, base: &Path) -> Result<Box<dyn StorageBackend>> {
        match self.storage {
            StorageKind::File => Ok(Box::new(JsonStorage::new(self.resolve_data_dir(base))?)),
            StorageKind::Local => Ok(Box::new(MemoryStorage::new())),
        }
    }

    pub fn account_store(&self, base: &Path) -> Result<AccountStore> {
        Ok(AccountStore::with_prefix(
            self.open_backend(base)?,
            self.key_prefix.clone(),
        ))
    }

    /// Data directory for file storage, relative to `base` unless configured.
    pub fn resolve_data_dir(&self, base: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathResolver::data_dir_in(base))
    }

    pub fn validate(&self) -> Result<()> {
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::Config(format!(
                "currency must be a three-letter code, got `{}`",
                self.currency
            )));
        }
        if self.key_prefix.contains(&['/', '\\'][..]) {
            return Err(LedgerError::Config(
                "key prefix may not contain path separators".into(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::from_base(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    /// Reads the stored configuration, falling back to defaults when none
    /// has been saved yet.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| LedgerError::Config(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
