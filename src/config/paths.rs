//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + training history):
//!   Windows: %APPDATA%\digit-span\
//!   macOS:   ~/Library/Application Support/digit-span/
//!   Linux:   ~/.config/digit-span/
//!
//! Data dir (recognition models):
//!   Windows: %LOCALAPPDATA%\digit-span\
//!   macOS:   ~/Library/Application Support/digit-span/
//!   Linux:   ~/.local/share/digit-span/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`, `records.json` and `stats.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `records.json` (append-only training history).
    pub records_file: PathBuf,
    /// Full path to `stats.json` (aggregate user statistics).
    pub stats_file: PathBuf,
    /// Directory for downloaded GGML model files (whisper feature).
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "digit-span";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::with_dirs(config_dir, data_dir.join("models"))
    }

    /// Lay the files out under an explicit directory (tests, portable mode).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::with_dirs(dir.to_path_buf(), dir.join("models"))
    }

    fn with_dirs(config_dir: PathBuf, models_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.toml"),
            records_file: config_dir.join("records.json"),
            stats_file: config_dir.join("stats.json"),
            config_dir,
            models_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
