//! Configuration file support for modt.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (MODT_*)
//! 3. Local config file (./modt.toml)
//! 4. Global config file (~/.config/modt/config.toml)
//!
//! Passing `--config <path>` replaces steps 3 and 4 with that single file.

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = "modt.toml";

/// USB device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Per-transfer timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Status loop configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Seconds between status polls.
    pub interval_secs: Option<u64>,
    /// Keep polling after the subcommand finished.
    #[serde(rename = "loop")]
    pub repeat: Option<bool>,
}

/// G-code upload configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Print interleaved status replies.
    #[serde(default)]
    pub print_status: bool,
    /// Print every submitted block.
    #[serde(default)]
    pub print_blocks: bool,
    /// Job id announced in the file push frame.
    pub job_id: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device configuration.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Status loop configuration.
    #[serde(default)]
    pub status: StatusConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "modt").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.device.timeout_ms.is_some() {
            self.device.timeout_ms = other.device.timeout_ms;
        }

        if other.status.interval_secs.is_some() {
            self.status.interval_secs = other.status.interval_secs;
        }
        if other.status.repeat.is_some() {
            self.status.repeat = other.status.repeat;
        }

        if other.upload.print_status {
            self.upload.print_status = true;
        }
        if other.upload.print_blocks {
            self.upload.print_blocks = true;
        }
        if other.upload.job_id.is_some() {
            self.upload.job_id = other.upload.job_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.device.timeout_ms.is_none());
        assert!(config.status.interval_secs.is_none());
        assert!(config.status.repeat.is_none());
        assert!(!config.upload.print_status);
        assert!(!config.upload.print_blocks);
        assert!(config.upload.job_id.is_none());
    }

    // ---- Config merge ----

    #[test]
    fn test_config_merge_overrides() {
        let mut base = Config::default();
        base.device.timeout_ms = Some(1000);
        base.status.interval_secs = Some(10);

        let mut other = Config::default();
        other.device.timeout_ms = Some(2500);
        other.status.repeat = Some(false);
        other.upload.job_id = Some("benchy".to_string());

        base.merge(other);

        assert_eq!(base.device.timeout_ms, Some(2500));
        assert_eq!(base.status.interval_secs, Some(10));
        assert_eq!(base.status.repeat, Some(false));
        assert_eq!(base.upload.job_id.as_deref(), Some("benchy"));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.device.timeout_ms = Some(1000);
        base.status.repeat = Some(true);
        base.upload.print_blocks = true;

        base.merge(Config::default());

        assert_eq!(base.device.timeout_ms, Some(1000));
        assert_eq!(base.status.repeat, Some(true));
        assert!(base.upload.print_blocks);
    }

    #[test]
    fn test_config_merge_upload_flags() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.upload.print_status = true;
        base.merge(other);
        assert!(base.upload.print_status);
        assert!(!base.upload.print_blocks);
    }

    // ---- TOML ----

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[device]
timeout_ms = 2000

[status]
interval_secs = 2
loop = false

[upload]
print_status = true
job_id = "calibration-cube"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.timeout_ms, Some(2000));
        assert_eq!(config.status.interval_secs, Some(2));
        assert_eq!(config.status.repeat, Some(false));
        assert!(config.upload.print_status);
        assert!(!config.upload.print_blocks);
        assert_eq!(config.upload.job_id.as_deref(), Some("calibration-cube"));
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.device.timeout_ms.is_none());
        assert!(config.status.repeat.is_none());
    }

    #[test]
    fn test_config_roundtrip_toml_keeps_loop_key() {
        let mut config = Config::default();
        config.status.repeat = Some(true);

        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("loop = true"));

        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.status.repeat, Some(true));
    }

    // ---- load_from_path ----

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modt.toml");
        fs::write(
            &path,
            r#"
[status]
interval_secs = 1
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.status.interval_secs, Some(1));
    }

    #[test]
    fn test_load_from_path_invalid_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[status\ninterval_secs = ").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.status.interval_secs.is_none());
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.device.timeout_ms.is_none());
    }

    #[test]
    fn test_global_config_path() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("modt"));
            assert!(p.to_str().unwrap().ends_with("config.toml"));
        }
    }
}
