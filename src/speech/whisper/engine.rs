//! Local speech recognition with Whisper.
//!
//! [`WhisperRecognizer`] records from the default microphone on a worker
//! thread and re-transcribes the whole recording every
//! [`TRANSCRIBE_INTERVAL`].  Each pass maps the transcript to digits and,
//! when they changed, reports the cumulative result through the sink.
//!
//! ```text
//! start_listening ─▶ worker thread
//!                     ├─ cpal chunks ─▶ downmix ─▶ recording
//!                     ├─ every interval: resample ─▶ whisper ─▶ digits ─▶ on_digits
//!                     └─ stop_listening / time limit ─▶ on_end
//! ```

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::digits::extract_spoken_digits;
use crate::speech::recognition::{
    ListenHandle, ListenSlot, RecognitionError, SpeechRecognizer, TranscriptSink,
};

use super::capture::{AudioChunk, MicCapture};
use super::resample::{downmix, to_whisper_rate, WHISPER_RATE};

/// Time between two transcription passes.
pub const TRANSCRIBE_INTERVAL: Duration = Duration::from_millis(1_000);

/// A listening session ends on its own after this long.
pub const MAX_LISTEN: Duration = Duration::from_secs(30);

/// Whisper needs at least 0.5 s of audio.
const MIN_SAMPLES: usize = WHISPER_RATE as usize / 2;

/// Default model file looked up in the models directory.
pub const DEFAULT_MODEL: &str = "ggml-base.bin";

#[derive(Debug, Clone, Error)]
pub enum WhisperError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("whisper initialisation failed: {0}")]
    ContextInit(String),

    #[error("transcription failed: {0}")]
    Transcription(String),
}

pub struct WhisperRecognizer {
    ctx: Arc<WhisperContext>,
    slot: Arc<ListenSlot>,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer").finish_non_exhaustive()
    }
}

impl WhisperRecognizer {
    /// Load a GGML model.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, WhisperError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(WhisperError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path.to_str().ok_or_else(|| {
            WhisperError::ModelNotFound(format!("non-UTF-8 path: {}", path.display()))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| WhisperError::ContextInit(e.to_string()))?;

        Ok(Self {
            ctx: Arc::new(ctx),
            slot: Arc::new(ListenSlot::default()),
        })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn is_supported(&self) -> bool {
        MicCapture::available()
    }

    fn start_listening(&self, language: &str, sink: TranscriptSink) -> Option<ListenHandle> {
        let handle = self.slot.acquire()?;

        let ctx = Arc::clone(&self.ctx);
        let slot = Arc::clone(&self.slot);
        let language = whisper_language(language);

        let spawned = std::thread::Builder::new()
            .name("whisper-listen".into())
            .spawn(move || listen(ctx, slot, handle, language, sink));

        match spawned {
            Ok(_) => Some(handle),
            Err(e) => {
                log::warn!("speech: cannot spawn listening thread: {e}");
                self.slot.release(Some(handle));
                None
            }
        }
    }

    fn stop_listening(&self, handle: Option<ListenHandle>) {
        // The worker notices the released slot and reports `on_end`.
        self.slot.release(handle);
    }
}

/// `"zh-CN"` → `"zh"`.
fn whisper_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .to_ascii_lowercase()
}

fn listen(
    ctx: Arc<WhisperContext>,
    slot: Arc<ListenSlot>,
    handle: ListenHandle,
    language: String,
    sink: TranscriptSink,
) {
    let (tx, rx) = mpsc::channel::<AudioChunk>();

    let guard = MicCapture::new().and_then(|mic| mic.start(tx));
    let _guard = match guard {
        Ok(g) => g,
        Err(e) => {
            slot.release(Some(handle));
            sink.on_error(RecognitionError::Failed(e.to_string()));
            sink.on_end();
            return;
        }
    };

    let started = Instant::now();
    let mut last_pass = Instant::now();
    let mut recording: Vec<f32> = Vec::new();
    let mut source_rate = WHISPER_RATE;
    let mut reported = String::new();

    while slot.is_active(handle) && started.elapsed() < MAX_LISTEN {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                source_rate = chunk.sample_rate;
                recording.extend(downmix(&chunk.samples, chunk.channels));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if last_pass.elapsed() < TRANSCRIBE_INTERVAL {
            continue;
        }
        last_pass = Instant::now();

        match transcribe_digits(&ctx, &recording, source_rate, &language) {
            Ok(Some(digits)) if digits != reported => {
                reported = digits;
                sink.on_digits(reported.clone());
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("speech: {e}");
                slot.release(Some(handle));
                sink.on_error(RecognitionError::Failed(e.to_string()));
                sink.on_end();
                return;
            }
        }
    }

    slot.release(Some(handle));
    if reported.is_empty() {
        sink.on_error(RecognitionError::NoSpeech);
    }
    sink.on_end();
}

/// Transcribe the whole recording.  `None` while it is too short.
fn transcribe_digits(
    ctx: &WhisperContext,
    recording: &[f32],
    source_rate: u32,
    language: &str,
) -> Result<Option<String>, WhisperError> {
    let audio = to_whisper_rate(recording, source_rate)
        .map_err(|e| WhisperError::Transcription(e.to_string()))?;
    if audio.len() < MIN_SAMPLES {
        return Ok(None);
    }

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| WhisperError::ContextInit(e.to_string()))?;
    state
        .full(params, &audio)
        .map_err(|e| WhisperError::Transcription(e.to_string()))?;

    let segments = state
        .full_n_segments()
        .map_err(|e| WhisperError::Transcription(e.to_string()))?;

    let mut text = String::new();
    for i in 0..segments {
        let segment = state
            .full_get_segment_text(i)
            .map_err(|e| WhisperError::Transcription(format!("segment {i}: {e}")))?;
        text.push_str(&segment);
    }

    Ok(Some(extract_spoken_digits(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_is_reduced_to_primary_subtag() {
        assert_eq!(whisper_language("zh-CN"), "zh");
        assert_eq!(whisper_language("en_US"), "en");
        assert_eq!(whisper_language("ja"), "ja");
    }

    #[test]
    fn missing_model_is_reported() {
        let err = WhisperRecognizer::load("/nonexistent/ggml-base.bin").unwrap_err();
        assert!(matches!(err, WhisperError::ModelNotFound(_)));
    }
}
