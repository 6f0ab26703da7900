pub mod directory;
pub mod error;
pub mod settings;

pub use directory::FileDirectory;
pub use error::*;
pub use settings::{CacheKindSettings, HttpSettings, ProviderEntry, Settings};

use std::path::{Path, PathBuf};

/// Environment variable pointing straight at a settings file
pub const CONFIG_ENV: &str = "VPSDECK_CONFIG";

/// vpsdeck config directory (`~/.config/vpsdeck` on Linux)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("vpsdeck");
    Ok(config_dir)
}

/// Locate the settings file, searching from the current directory
pub fn find_config_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_config_file_in(&current_dir)
}

/// Locate the settings file
///
/// Search order:
/// 1. `VPSDECK_CONFIG` environment variable
/// 2. `<dir>/vpsdeck.yaml`
/// 3. `<dir>/.vpsdeck/config.yaml`
/// 4. `<config_dir>/vpsdeck/config.yaml`
pub fn find_config_file_in(dir: &Path) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to missing file {}", CONFIG_ENV, path.display());
    }

    let candidates = [
        dir.join("vpsdeck.yaml"),
        dir.join(".vpsdeck").join("config.yaml"),
    ];
    if let Some(path) = candidates.into_iter().find(|p| p.exists()) {
        return Ok(path);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Find and load settings; an explicit path skips the search
pub fn load_settings(explicit: Option<&Path>) -> Result<(PathBuf, Settings)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let settings = Settings::load(&path)?;
    Ok((path, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("vpsdeck"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("vpsdeck.yaml"), "providers: []").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let path = find_config_file_in(temp_dir.path()).unwrap();
            assert!(path.ends_with("vpsdeck.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_top_level_file_wins_over_dot_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dot_dir = temp_dir.path().join(".vpsdeck");
        fs::create_dir(&dot_dir).unwrap();
        fs::write(dot_dir.join("config.yaml"), "providers: []").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let path = find_config_file_in(temp_dir.path()).unwrap();
            assert!(path.ends_with(".vpsdeck/config.yaml"));

            fs::write(temp_dir.path().join("vpsdeck.yaml"), "providers: []").unwrap();
            let path = find_config_file_in(temp_dir.path()).unwrap();
            assert!(path.ends_with("vpsdeck.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "providers: []").unwrap();
        fs::write(temp_dir.path().join("vpsdeck.yaml"), "providers: []").unwrap();

        temp_env::with_var(CONFIG_ENV, Some(config_path.as_os_str()), || {
            let result = find_config_file_in(temp_dir.path()).unwrap();
            assert_eq!(result, config_path);
        });
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_home = tempfile::tempdir().unwrap();

        // Point the platform config dir at an empty location
        temp_env::with_vars(
            [
                (CONFIG_ENV, None),
                ("XDG_CONFIG_HOME", Some(config_home.path().as_os_str())),
            ],
            || {
                if cfg!(target_os = "linux") {
                    let result = find_config_file_in(temp_dir.path());
                    assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
                }
            },
        );
    }

    #[test]
    #[serial]
    fn test_load_settings_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("other.yaml");
        fs::write(&path, "providers:\n  - {id: p1, type: linode, token: t}\n").unwrap();

        let (loaded_from, settings) = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded_from, path);
        assert_eq!(settings.providers[0].id, "p1");
    }
}
