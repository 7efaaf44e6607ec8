use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Fixed namespace the configuration blob is stored under.
pub const CONFIG_NAMESPACE: &str = "dropzone-config";

const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 10;

/// Upload settings, loaded once at startup and overwritten wholesale on save.
///
/// Every field carries a serde default so a partially-present persisted blob
/// falls back key-by-key instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Patterns a file must match when non-empty. A pattern starting with `.`
    /// matches the file name's extension, anything else matches as a
    /// substring of the MIME type. Empty means all types are allowed.
    #[serde(default)]
    pub allowed_type_patterns: Vec<String>,
    /// Caps how many files a single add call accepts.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default)]
    pub auto_upload: bool,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            allowed_type_patterns: Vec::new(),
            max_files: DEFAULT_MAX_FILES,
            auto_upload: false,
        }
    }
}

pub fn validate_config(config: &UploadConfig) -> AppResult<()> {
    if config.max_file_size_bytes == 0 {
        return Err(AppError::config("max_file_size_bytes must be greater than 0"));
    }

    if config.max_files == 0 {
        return Err(AppError::config("max_files must be greater than 0"));
    }

    Ok(())
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::config("Could not find config directory"))?
        .join("dropzone-queue");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join(format!("{}.json", CONFIG_NAMESPACE)))
}

pub fn load_config() -> AppResult<UploadConfig> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let config_str = fs::read_to_string(&config_path)?;
        let config: UploadConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            UploadConfig::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        let default_config = UploadConfig::default();
        save_config_internal(&default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config: &UploadConfig) -> AppResult<()> {
    validate_config(config)?;
    save_config_internal(config)
}

fn save_config_internal(config: &UploadConfig) -> AppResult<()> {
    let config_path = get_config_path()?;

    // Keep one backup of the previous blob
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(&config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_str)?;

    log::info!("Configuration saved successfully");
    Ok(())
}

pub fn get_data_directory() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::config("Could not find data directory"))?
        .join("dropzone-queue");

    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}
