use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typr";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typr_config.json"))
    }

    pub fn history_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("history.json"))
            .unwrap_or_else(|| PathBuf::from("typr_history.json"))
    }

    /// Logs go under $HOME/.local/state/typr when HOME is set.
    pub fn log_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else {
            Self::project()
                .map(|pd| pd.data_local_dir().join("logs"))
                .unwrap_or_else(|| PathBuf::from("typr-logs"))
        }
    }
}
