//! Configuration at ~/.config/hondenschool/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{HondenschoolError, HondenschoolResult};
use crate::sheets::{
    DEFAULT_BACKOFF, DEFAULT_CACHE_TTL, DEFAULT_RETRIES, DEFAULT_TIMEOUT, SheetClient,
    SheetOptions, normalize_endpoint,
};
use crate::store::{BucketStore, FileStore};

static DEFAULT_DATA_DIR: &str = "~/.local/share/hondenschool";
const ENV_PREFIX: &str = "HONDENSCHOOL";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF.as_millis() as u64
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HondenschoolConfig {
    /// Remote sheet endpoint, as entered by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Site hosting the `/api/sheets` proxy and the `/data/*.json` exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Where the local buckets live.
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for HondenschoolConfig {
    fn default() -> Self {
        HondenschoolConfig {
            base_url: None,
            origin: None,
            data_dir: default_data_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl HondenschoolConfig {
    pub fn config_path() -> HondenschoolResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                HondenschoolError::Config("Could not determine config directory".into())
            })?
            .join("hondenschool");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, creating a commented default on first run.
    /// `HONDENSCHOOL_*` environment variables override the file.
    pub fn load() -> HondenschoolResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::build(&config_path, true)
    }

    /// The config file alone, without environment overrides. Use this as the
    /// base for edits that are saved back, so a temporary `HONDENSCHOOL_*`
    /// variable never ends up in the file.
    pub fn load_file() -> HondenschoolResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit file, without environment overrides.
    pub fn load_from(path: &Path) -> HondenschoolResult<Self> {
        Self::build(path, false)
    }

    fn build(path: &Path, with_env: bool) -> HondenschoolResult<Self> {
        let mut builder = Config::builder().add_source(File::from(path).required(false));

        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        }

        builder
            .build()
            .map_err(|e| HondenschoolError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| HondenschoolError::Config(e.to_string()))
    }

    /// Save to ~/.config/hondenschool/config.toml
    pub fn save(&self) -> HondenschoolResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> HondenschoolResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| HondenschoolError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| {
            HondenschoolError::Config(format!("Could not write config file: {e}"))
        })?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> HondenschoolResult<()> {
        let contents = format!(
            "\
# hondenschool configuration

# Remote sheet endpoint (set with `hondenschool config set-base-url`):
# base_url = \"https://script.google.com/macros/s/<id>/exec\"

# Site serving /api/sheets and the /data/*.json exports:
# origin = \"https://hondenschool.example\"

# Where local buckets are stored:
# data_dir = \"{}\"

# Remote tuning:
# cache_ttl_secs = {}
# timeout_secs = {}
# retries = {}
# backoff_ms = {}
",
            DEFAULT_DATA_DIR,
            default_cache_ttl_secs(),
            default_timeout_secs(),
            default_retries(),
            default_backoff_ms(),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HondenschoolError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| HondenschoolError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn set_base_url(&mut self, url: &str) -> HondenschoolResult<()> {
        self.base_url = Some(normalize_endpoint(url, "base URL")?);
        Ok(())
    }

    pub fn set_origin(&mut self, url: &str) -> HondenschoolResult<()> {
        self.origin = Some(normalize_endpoint(url, "origin")?);
        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn sheet_options(&self) -> SheetOptions {
        SheetOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    /// HTTP sheet client with the configured endpoint and origin.
    pub fn sheet_client(&self) -> HondenschoolResult<SheetClient> {
        let mut client = SheetClient::new(
            crate::sheets::ReqwestTransport::new()?,
            self.sheet_options(),
        );

        if let Some(base_url) = &self.base_url {
            client.set_base_url(base_url)?;
        }
        if let Some(origin) = &self.origin {
            client.set_origin(origin)?;
        }

        Ok(client)
    }

    pub fn bucket_store(&self) -> BucketStore<FileStore> {
        BucketStore::new(FileStore::new(self.data_path()))
    }
}
