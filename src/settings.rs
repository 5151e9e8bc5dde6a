use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub catalog: Catalog,
    pub session: Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Directory of `.kdl` catalog files.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Path of the persisted session JSON file.
    pub store_path: PathBuf,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("catalog"),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/session.json"),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default(
                "catalog.dir",
                Catalog::default().dir.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default(
                "session.store_path",
                Session::default().store_path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: FLEETGATE__SESSION__STORE_PATH=/tmp/s.json, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("FLEETGATE").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let s: Settings = cfg.try_deserialize().into_diagnostic()?;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serializes tests that read or mutate process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_settings_load_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings =
            Settings::load(config_path.to_str().unwrap()).expect("Failed to load settings");

        assert_eq!(settings.catalog.dir, PathBuf::from("catalog"));
        assert_eq!(settings.session.store_path, PathBuf::from("data/session.json"));
    }

    #[test]
    fn test_settings_load_from_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[catalog]
dir = "fixtures/catalog"

[session]
store_path = "/tmp/fleetgate-session.json"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings =
            Settings::load(config_path.to_str().unwrap()).expect("Failed to load settings");

        assert_eq!(settings.catalog.dir, PathBuf::from("fixtures/catalog"));
        assert_eq!(
            settings.session.store_path,
            PathBuf::from("/tmp/fleetgate-session.json")
        );
    }

    #[test]
    fn test_settings_env_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[catalog]
dir = "catalog"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        std::env::set_var("FLEETGATE__CATALOG__DIR", "/etc/fleetgate/catalog");

        let settings =
            Settings::load(config_path.to_str().unwrap()).expect("Failed to load settings");

        assert_eq!(settings.catalog.dir, PathBuf::from("/etc/fleetgate/catalog"));

        std::env::remove_var("FLEETGATE__CATALOG__DIR");
    }
}
