use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("seekr"))
        } else {
            ProjectDirs::from("", "", "seekr").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// Offline leaderboard database.
    pub fn leaderboard_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("leaderboard.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("seekr.log"))
    }
}
