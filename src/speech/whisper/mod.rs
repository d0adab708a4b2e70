//! Whisper-backed speech recognition (`whisper` feature).

pub mod capture;
pub mod engine;
pub mod resample;

pub use engine::{WhisperError, WhisperRecognizer, DEFAULT_MODEL};
