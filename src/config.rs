use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::content::Mode;

pub const DEFAULT_WORD_COUNT: usize = 30;
pub const DEFAULT_TICK_MS: u64 = 50;
const MIN_TICK_MS: u64 = 10;
const MAX_TICK_MS: u64 = 1000;

/// Stored defaults for a run; CLI flags override them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub word_count: usize,
    /// 0 means unlimited
    pub time_limit_secs: u64,
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Quote,
            word_count: DEFAULT_WORD_COUNT,
            time_limit_secs: 0,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl Config {
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.clamp(MIN_TICK_MS, MAX_TICK_MS))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Config>(&bytes).ok())
            .unwrap_or_default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("sub").join("config.json"));
        let cfg = Config {
            mode: Mode::Code,
            word_count: 60,
            time_limit_secs: 45,
            tick_ms: 80,
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "mode": "code" }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.mode, Mode::Code);
        assert_eq!(cfg.word_count, DEFAULT_WORD_COUNT);
    }

    #[test]
    fn time_limit_and_tick() {
        let mut cfg = Config::default();
        assert_eq!(cfg.time_limit(), None);
        cfg.time_limit_secs = 30;
        assert_eq!(cfg.time_limit(), Some(Duration::from_secs(30)));

        cfg.tick_ms = 1;
        assert_eq!(cfg.tick_interval(), Duration::from_millis(10));
        cfg.tick_ms = 60_000;
        assert_eq!(cfg.tick_interval(), Duration::from_millis(1000));
    }
}
