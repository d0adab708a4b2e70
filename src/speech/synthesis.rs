//! Text-to-speech adapters.
//!
//! [`SpeechSynthesizer`] is the async, object-safe interface the trainer
//! speaks through.  Speaking is exclusive: a new [`speak`] cancels the
//! utterance in progress, and [`stop`] cancels immediately.
//!
//! * [`CommandSynthesizer`] drives an external TTS program found on `PATH`
//!   (`espeak-ng`, `espeak` or macOS `say`).
//! * [`SilentSynthesizer`] reports itself unsupported; the trainer then
//!   works without speech output.
//!
//! [`speak`]: SpeechSynthesizer::speak
//! [`stop`]: SpeechSynthesizer::stop

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::watch;

use crate::config::VoiceConfig;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// No speech output on this system.
    #[error("speech output is not supported")]
    Unsupported,

    /// The TTS program could not be started or exited with an error.
    #[error("speech output failed: {0}")]
    Failed(String),

    /// A newer utterance or `stop()` cut this one short.
    #[error("utterance cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe text-to-speech interface.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Checked once at startup; may be re-checked.
    fn is_supported(&self) -> bool;

    /// Speak `text` and resolve when the utterance has finished.  Cancels
    /// any utterance in progress first.
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError>;

    /// Cancel the utterance in progress.  Idempotent.
    fn stop(&self);
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechSynthesizer>) {}
};

// ---------------------------------------------------------------------------
// Phrases
// ---------------------------------------------------------------------------

fn is_chinese(language: &str) -> bool {
    language.to_ascii_lowercase().starts_with("zh")
}

/// Spoken before the digits of a round.
pub fn digits_announcement(language: &str) -> &'static str {
    if is_chinese(language) {
        "请注意听"
    } else {
        "Listen carefully"
    }
}

/// Verdict read after a submission.  A wrong answer is followed by the
/// expected digits, spaced so they are read one by one.
///
/// ```
/// use digit_span::speech::result_message;
///
/// assert_eq!(result_message(true, "482", "zh-CN"), "正确");
/// assert_eq!(result_message(false, "482", "zh-CN"), "错误，正确答案是 4 8 2");
/// assert_eq!(result_message(false, "57", "en-US"), "Wrong, the correct answer is 5 7");
/// ```
pub fn result_message(correct: bool, expected: &str, language: &str) -> String {
    let spaced = expected
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ");

    match (correct, is_chinese(language)) {
        (true, true) => "正确".into(),
        (true, false) => "Correct".into(),
        (false, true) => format!("错误，正确答案是 {spaced}"),
        (false, false) => format!("Wrong, the correct answer is {spaced}"),
    }
}

/// Read a round's digits: the announcement, then each digit on its own
/// with `pause` between digits.
pub async fn speak_digits(
    synth: &dyn SpeechSynthesizer,
    digits: &str,
    voice: &VoiceConfig,
    pause: Duration,
) -> Result<(), SpeechError> {
    synth
        .speak(digits_announcement(&voice.language), voice)
        .await?;

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        synth.speak(&digit.to_string(), voice).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SilentSynthesizer
// ---------------------------------------------------------------------------

/// Speech output for systems without a TTS program.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSynthesizer;

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    fn stop(&self) {}
}

// ---------------------------------------------------------------------------
// CommandSynthesizer
// ---------------------------------------------------------------------------

/// External TTS programs, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProgram {
    EspeakNg,
    Espeak,
    Say,
}

impl TtsProgram {
    const ALL: [TtsProgram; 3] = [TtsProgram::EspeakNg, TtsProgram::Espeak, TtsProgram::Say];

    pub fn binary(&self) -> &'static str {
        match self {
            TtsProgram::EspeakNg => "espeak-ng",
            TtsProgram::Espeak => "espeak",
            TtsProgram::Say => "say",
        }
    }
}

/// Words per minute at rate 1.0.
const BASE_WPM: f32 = 175.0;

/// Command-line arguments for one utterance.
pub fn command_args(program: TtsProgram, text: &str, voice: &VoiceConfig) -> Vec<String> {
    let wpm = (BASE_WPM * voice.effective_rate()).round() as u32;

    match program {
        TtsProgram::EspeakNg | TtsProgram::Espeak => {
            let voice_name = if is_chinese(&voice.language) {
                "cmn".to_string()
            } else {
                voice.language.to_ascii_lowercase()
            };
            let pitch = (voice.pitch.clamp(0.0, 2.0) * 50.0).round().min(99.0) as u32;
            let amplitude = (voice.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
            vec![
                "-v".into(),
                voice_name,
                "-s".into(),
                wpm.to_string(),
                "-p".into(),
                pitch.to_string(),
                "-a".into(),
                amplitude.to_string(),
                text.into(),
            ]
        }
        TtsProgram::Say => vec!["-r".into(), wpm.to_string(), text.into()],
    }
}

fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Speaks through an external TTS program, one child process per utterance.
///
/// ```rust,no_run
/// use digit_span::config::VoiceConfig;
/// use digit_span::speech::{CommandSynthesizer, SpeechSynthesizer};
///
/// # async fn example() {
/// if let Some(synth) = CommandSynthesizer::detect() {
///     synth.speak("4", &VoiceConfig::default()).await.ok();
/// }
/// # }
/// ```
pub struct CommandSynthesizer {
    program: TtsProgram,
    path: PathBuf,
    /// Bumped by every `speak` and `stop`; an utterance ends when it changes.
    generation: watch::Sender<u64>,
}

impl std::fmt::Debug for CommandSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSynthesizer")
            .field("program", &self.program)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CommandSynthesizer {
    /// Use the first TTS program found on `PATH`.
    pub fn detect() -> Option<Self> {
        TtsProgram::ALL.iter().find_map(|program| {
            find_on_path(program.binary()).map(|path| Self::with_program(*program, path))
        })
    }

    pub fn with_program(program: TtsProgram, path: impl AsRef<Path>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            program,
            path: path.as_ref().to_path_buf(),
            generation,
        }
    }

    pub fn program(&self) -> TtsProgram {
        self.program
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    fn is_supported(&self) -> bool {
        self.path.is_file()
    }

    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        // Cancel whatever is playing, then watch for the next change.
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
        let mut cancelled = self.generation.subscribe();

        let mut child = Command::new(&self.path)
            .args(command_args(self.program, text, voice))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Failed(format!("{}: {e}", self.program.binary())))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| SpeechError::Failed(e.to_string()))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SpeechError::Failed(format!(
                        "{} exited with {status}",
                        self.program.binary()
                    )))
                }
            }
            _ = cancelled.changed() => {
                if let Err(e) = child.kill().await {
                    log::debug!("speech: kill after cancel failed: {e}");
                }
                Err(SpeechError::Cancelled)
            }
        }
    }

    fn stop(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// Records every utterance instead of playing it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    spoken: std::sync::Mutex<Vec<String>>,
    stops: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSynthesizer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn is_supported(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.stops
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
