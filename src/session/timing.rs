//! Timing policy: every delay the session engine and auto-pilot schedule.
//!
//! All formulas live here.  The one rule the rest of the crate relies on:
//! when speech output is on, the digits stay visible at least as long as
//! [`TimingPolicy::speech_estimate`] says reading them aloud takes.
//!
//! | Delay                  | Formula (ms)                                    |
//! |------------------------|-------------------------------------------------|
//! | speech estimate        | ⌈(800 + 800 + n·1200 + n·300) / rate⌉           |
//! | display (all at once)  | max(display_duration, speech)                   |
//! | display (sequential)   | max(digit_display_duration · n, speech)         |
//! | auto-continue, correct | 3000                                            |
//! | auto-continue, wrong   | 7000 + n·700                                    |
//! | record settle          | 500                                             |
//! | confirm submit         | 300                                             |
//! | self-correct window    | 1000 + n·500                                    |
//! | inter-digit TTS pause  | 200 / rate                                      |

use std::time::Duration;

use crate::config::{TrainingConfig, VoiceConfig};

/// Tunable constants of the timing formulas, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingPolicy {
    /// Engine warm-up before the first utterance.
    pub speech_lead_in_ms: u64,
    /// Length of the "listen carefully" announcement.
    pub announcement_ms: u64,
    /// One spoken digit.
    pub per_digit_speech_ms: u64,
    /// Gap between two spoken digits.
    pub inter_digit_gap_ms: u64,
    pub continue_correct_ms: u64,
    pub continue_incorrect_base_ms: u64,
    pub continue_incorrect_per_digit_ms: u64,
    /// Pause between entering input and opening the microphone, so the tail
    /// of the speech output is not captured.
    pub record_settle_ms: u64,
    /// Delay before submitting a transcript that already matches.
    pub confirm_submit_ms: u64,
    pub self_correct_base_ms: u64,
    pub self_correct_per_digit_ms: u64,
    /// Pause the synthesiser inserts between digits at rate 1.0.
    pub tts_digit_pause_ms: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            speech_lead_in_ms: 800,
            announcement_ms: 800,
            per_digit_speech_ms: 1_200,
            inter_digit_gap_ms: 300,
            continue_correct_ms: 3_000,
            continue_incorrect_base_ms: 7_000,
            continue_incorrect_per_digit_ms: 700,
            record_settle_ms: 500,
            confirm_submit_ms: 300,
            self_correct_base_ms: 1_000,
            self_correct_per_digit_ms: 500,
            tts_digit_pause_ms: 200,
        }
    }
}

impl TimingPolicy {
    /// Estimated time to read `digit_count` digits aloud, announcement
    /// included, at the voice's rate.
    pub fn speech_estimate(&self, digit_count: usize, voice: &VoiceConfig) -> Duration {
        let n = digit_count as u64;
        let base = self.speech_lead_in_ms
            + self.announcement_ms
            + n * self.per_digit_speech_ms
            + n * self.inter_digit_gap_ms;
        let scaled = (base as f64 / f64::from(voice.effective_rate())).ceil();
        Duration::from_millis(scaled as u64)
    }

    /// How long the digits stay on screen.
    ///
    /// ```
    /// use std::time::Duration;
    /// use digit_span::config::{TrainingConfig, VoiceConfig};
    /// use digit_span::session::TimingPolicy;
    ///
    /// let timing = TimingPolicy::default();
    /// let training = TrainingConfig::default();
    /// let mut voice = VoiceConfig::default();
    /// voice.enabled = false;
    ///
    /// assert_eq!(
    ///     timing.display_duration(3, &training, &voice, true),
    ///     Duration::from_millis(2_000)
    /// );
    /// ```
    pub fn display_duration(
        &self,
        digit_count: usize,
        training: &TrainingConfig,
        voice: &VoiceConfig,
        speech_output: bool,
    ) -> Duration {
        let configured = if training.sequential_display {
            Duration::from_millis(training.digit_display_duration_ms * digit_count as u64)
        } else {
            Duration::from_millis(training.display_duration_ms)
        };

        if voice.enabled && speech_output {
            configured.max(self.speech_estimate(digit_count, voice))
        } else {
            configured
        }
    }

    /// Delay before the next round starts on its own.
    pub fn auto_continue_delay(&self, correct: bool, digit_count: usize) -> Duration {
        let ms = if correct {
            self.continue_correct_ms
        } else {
            self.continue_incorrect_base_ms
                + digit_count as u64 * self.continue_incorrect_per_digit_ms
        };
        Duration::from_millis(ms)
    }

    pub fn record_settle_delay(&self) -> Duration {
        Duration::from_millis(self.record_settle_ms)
    }

    pub fn confirm_submit_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_submit_ms)
    }

    /// How long a complete but wrong transcript may still be corrected by
    /// speaking on before it is submitted anyway.
    pub fn self_correct_delay(&self, digit_count: usize) -> Duration {
        Duration::from_millis(
            self.self_correct_base_ms + digit_count as u64 * self.self_correct_per_digit_ms,
        )
    }

    /// Pause between individually spoken digits.
    pub fn inter_digit_pause(&self, voice: &VoiceConfig) -> Duration {
        let ms = (self.tts_digit_pause_ms as f64 / f64::from(voice.effective_rate())).round();
        Duration::from_millis(ms as u64)
    }
}
