//! Default locations of the files both binaries share.
//!
//! `state.db` and the `snapshots/` directory live under the data dir,
//! `config.toml` under the config dir. Both are `Domovik` subdirectories of the
//! user's platform dirs and fall back to the working directory when no home
//! is known.

use std::path::PathBuf;

const APP_DIR: &str = "Domovik";

fn app_dir(platform: Option<PathBuf>, home_fallback: &str) -> PathBuf {
    platform
        .or_else(|| dirs::home_dir().map(|h| h.join(home_fallback)))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Holds `state.db` and `snapshots/`.
pub fn get_data_dir() -> PathBuf {
    app_dir(dirs::data_local_dir().or_else(dirs::data_dir), ".data")
}

/// Holds `config.toml`. Prefers the config dir, then the data dir.
pub fn get_config_dir() -> PathBuf {
    app_dir(dirs::config_dir().or_else(dirs::data_dir), ".config")
}

pub fn get_default_state_path() -> PathBuf {
    get_data_dir().join("state.db")
}

/// Where the snapshot host looks for `tabs.json` and `bookmarks.json`.
pub fn get_default_snapshot_dir() -> PathBuf {
    get_data_dir().join("snapshots")
}

pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn paths_are_namespaced() {
        assert!(get_data_dir().ends_with(APP_DIR));
        assert!(get_config_dir().ends_with(APP_DIR));
        assert!(get_default_state_path().ends_with(Path::new(APP_DIR).join("state.db")));
        assert!(get_default_snapshot_dir().starts_with(get_data_dir()));
        assert!(get_default_config_path().ends_with("config.toml"));
    }

    #[test]
    fn missing_platform_dir_falls_back_under_home_or_cwd() {
        let dir = app_dir(None, ".data");
        assert!(dir.ends_with(APP_DIR));
        match dirs::home_dir() {
            Some(home) => assert_eq!(dir, home.join(".data").join(APP_DIR)),
            None => assert_eq!(dir, Path::new(".").join(APP_DIR)),
        }
    }
}
