use crate::error::{Error, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "http://localhost:5000";
pub const DEFAULT_STORAGE_KEY: &str = "chat-app-user";
pub const HOST_ENV: &str = "CHATSPHERE_HOST";
pub const STORAGE_KEY_ENV: &str = "CHATSPHERE_STORAGE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Backend origin, REST routes live under `{host}/api` and the socket under `{host}/socket.io`.
    pub host: String,
    /// Local storage key the session identity is persisted under.
    pub storage_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl AppConfig {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("chatsphere.toml"))
    }

    /// Config file first, then environment overrides on top. A missing file is
    /// written out with the defaults so there is something to edit.
    pub fn load() -> Self {
        let from_file = match Self::toml_path() {
            Some(path) => Self::load_or_init(&path),
            None => Self::default(),
        };
        from_file.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            let cfg = Self::default();
            if let Err(e) = cfg.save_to(path) {
                log::warn!("could not write default config to {}: {e}", path.display());
            }
            return cfg;
        }
        Self::load_from(path).unwrap_or_else(|e| {
            log::warn!("ignoring unusable config at {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut cfg = toml::from_str::<AppConfig>(&text).map_err(|e| Error::Config(e.to_string()))?;
        cfg.host = crate::utils::normalize_url(&cfg.host);
        Ok(cfg)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup(HOST_ENV).filter(|v| !v.trim().is_empty()) {
            self.host = crate::utils::normalize_url(&host);
        }
        if let Some(key) = lookup(STORAGE_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.storage_key = key;
        }
        self
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn api_base(&self) -> String {
        let trimmed = self.host.trim_end_matches('/');
        if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) }
    }
}

#[cfg(feature = "gui")]
pub fn build_ui(app: &adw::Application) {
    let config = AppConfig::load();
    let session = match crate::session::SessionStore::open_default(&config.storage_key) {
        Ok(store) => store,
        Err(e) => {
            log::error!("cannot open local storage: {e}");
            return;
        }
    };
    crate::ui::navigate(app, &config, &session, crate::session::route(&session));
}
