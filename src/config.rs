use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default token endpoint for the Nebula backend.
pub const DEFAULT_AUTH_URL: &str = "https://nebula.starbreeze.com/iam/v3/oauth/token";

/// Application configuration, loaded from `~/.nebulafarm/config.toml`.
///
/// The data directory also holds every on-disk collaborator: the request
/// template store (`request.json`), remembered credentials
/// (`credentials.json`), the item catalog (`offsets.json`) and the cached
/// weapon stats (`weapons.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Token endpoint. Overridable for testing against a mock backend.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Computed at load time; never serialized.
    #[serde(skip)]
    pub data_dir: PathBuf,

    #[serde(skip)]
    config_path: PathBuf,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            data_dir: PathBuf::new(),
            config_path: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(home.join(".nebulafarm"))
    }

    /// Load the config rooted at an explicit directory. Split out of
    /// [`Config::load_or_init`] so tests can run against a temp dir.
    pub fn load_or_init_at(data_dir: PathBuf) -> Result<Self> {
        let config_path = data_dir.join("config.toml");

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory: {}", data_dir.display())
            })?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.data_dir = data_dir;
            config.config_path = config_path;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.data_dir = data_dir;
            config.config_path = config_path;
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml).context("Failed to write config file")?;
        Ok(())
    }

    pub fn templates_path(&self) -> PathBuf {
        self.data_dir.join("request.json")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("offsets.json")
    }

    pub fn weapons_path(&self) -> PathBuf {
        self.data_dir.join("weapons.json")
    }
}
