//! Configuration module for the digit-span trainer.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for training,
//! voice output, speech recognition and the window, `AppPaths` for
//! cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, RecognitionConfig, TrainingConfig, UiConfig, VoiceConfig};
