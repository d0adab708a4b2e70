//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every struct is `#[serde(default)]`: a settings file written by an older
//! build, or edited by hand, loads with the missing keys filled in.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// TrainingConfig
// ---------------------------------------------------------------------------

/// Display timing, automation switches and the persisted adaptive-difficulty
/// triple (`current_digit_count`, `consecutive_correct`,
/// `consecutive_incorrect`).
///
/// The camelCase aliases accept documents exported by the browser edition
/// of the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Total display time in ms when all digits are shown at once.
    #[serde(alias = "displayDuration")]
    pub display_duration_ms: u64,
    /// Time per digit in ms when digits are shown one by one.
    #[serde(alias = "digitDisplayDuration")]
    pub digit_display_duration_ms: u64,
    /// Show digits one at a time instead of all together.
    #[serde(alias = "sequentialDisplay")]
    pub sequential_display: bool,
    /// Difficulty for the next round.  Never below 3.
    #[serde(alias = "currentDigitCount")]
    pub current_digit_count: usize,
    #[serde(alias = "consecutiveCorrect")]
    pub consecutive_correct: u32,
    #[serde(alias = "consecutiveIncorrect")]
    pub consecutive_incorrect: u32,
    /// Start the next round automatically after the result.
    #[serde(alias = "autoContinue")]
    pub auto_continue: bool,
    /// Start listening automatically once the digits are hidden.
    #[serde(alias = "autoRecord")]
    pub auto_record: bool,
    /// Submit automatically once enough digits were recognised.
    #[serde(alias = "autoSubmit")]
    pub auto_submit: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            display_duration_ms: 2_000,
            digit_display_duration_ms: 1_000,
            sequential_display: false,
            current_digit_count: 3,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            auto_continue: false,
            auto_record: false,
            auto_submit: false,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Text-to-speech settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Read digits and results aloud.
    pub enabled: bool,
    /// Speaking rate multiplier, 0.1 – 10.  1.0 is normal speed.
    pub rate: f32,
    /// Pitch multiplier, 0 – 2.
    pub pitch: f32,
    /// Volume, 0 – 1.
    pub volume: f32,
    /// BCP-47 language tag of the voice (e.g. `"zh-CN"`, `"en-US"`).
    pub language: String,
}

impl VoiceConfig {
    pub const MIN_RATE: f32 = 0.1;
    pub const MAX_RATE: f32 = 10.0;

    /// `rate` clamped to its legal range; unusable values fall back to 1.0.
    ///
    /// ```
    /// use digit_span::config::VoiceConfig;
    ///
    /// let mut voice = VoiceConfig::default();
    /// voice.rate = 0.0;
    /// assert_eq!(voice.effective_rate(), 1.0);
    /// voice.rate = 50.0;
    /// assert_eq!(voice.effective_rate(), 10.0);
    /// ```
    pub fn effective_rate(&self) -> f32 {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return 1.0;
        }
        self.rate.clamp(Self::MIN_RATE, Self::MAX_RATE)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "zh-CN".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Speech-to-text settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Show the microphone button during input.
    pub enabled: bool,
    /// BCP-47 language tag passed to the recogniser.
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            language: "zh-CN".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` lets
    /// the window manager choose.
    pub window_position: Option<(f32, f32)>,
    /// Initial inner size of the window.
    pub window_size: (f32, f32),
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            window_size: (440.0, 380.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use digit_span::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display timing, automation and adaptive difficulty.
    pub training: TrainingConfig,
    /// Text-to-speech settings.
    pub voice: VoiceConfig,
    /// Speech-to-text settings.
    pub recognition: RecognitionConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Take every user-editable setting from `edited` but keep this
    /// config's adaptive-difficulty triple.
    ///
    /// The settings screen edits a copy taken when it opened; meanwhile the
    /// trainer keeps writing the triple after every answer.
    pub fn apply_preferences(&mut self, edited: &AppConfig) {
        let digit_count = self.training.current_digit_count;
        let correct = self.training.consecutive_correct;
        let incorrect = self.training.consecutive_incorrect;

        *self = edited.clone();

        self.training.current_digit_count = digit_count;
        self.training.consecutive_correct = correct;
        self.training.consecutive_incorrect = incorrect;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
