//! Speech capabilities — text-to-speech and speech-to-text adapters.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────┐   ┌──────────────────────────────────┐
//! │ SpeechSynthesizer (trait)   │   │ SpeechRecognizer (trait)         │
//! │  ├─ CommandSynthesizer      │   │  ├─ WhisperRecognizer (feature)  │
//! │  └─ SilentSynthesizer       │   │  └─ UnsupportedRecognizer        │
//! │ speak() cancels the previous│   │ one ListenHandle at a time,      │
//! │ utterance; stop() idempotent│   │ cumulative on_digits via sink    │
//! └─────────────────────────────┘   └──────────────────────────────────┘
//! ```
//!
//! Both capabilities are optional and detected independently; the result
//! is summarised in [`Capabilities`].

pub mod recognition;
pub mod synthesis;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use recognition::{
    ListenHandle, ListenSlot, RecognitionError, RecognitionEvent, SpeechRecognizer,
    TranscriptSink, UnsupportedRecognizer,
};
pub use synthesis::{
    command_args, digits_announcement, result_message, speak_digits, CommandSynthesizer,
    SilentSynthesizer, SpeechError, SpeechSynthesizer, TtsProgram,
};

#[cfg(test)]
pub use recognition::MockRecognizer;
#[cfg(test)]
pub use synthesis::MockSynthesizer;

/// Which speech capabilities this system has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Text-to-speech is available.
    pub speech_output: bool,
    /// Speech-to-text is available.
    pub speech_input: bool,
}

impl Capabilities {
    /// Neither capability; everything is keyboard-driven.
    pub fn none() -> Self {
        Self::default()
    }

    /// Run both capability checks.
    pub fn detect(synth: &dyn SpeechSynthesizer, recognizer: &dyn SpeechRecognizer) -> Self {
        Self {
            speech_output: synth.is_supported(),
            speech_input: recognizer.is_supported(),
        }
    }
}
