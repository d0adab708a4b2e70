//! Adaptive difficulty: the digit count follows the user's streaks.
//!
//! Two correct answers in a row raise the next round by one digit; two
//! wrong answers in a row lower it by one, never below
//! [`MIN_DIGIT_COUNT`].

use crate::config::TrainingConfig;

/// Shortest sequence the trainer ever asks for.
pub const MIN_DIGIT_COUNT: usize = 3;

/// Streak length that triggers a difficulty change.
pub const STREAK_THRESHOLD: u32 = 2;

// ---------------------------------------------------------------------------
// StreakReset
// ---------------------------------------------------------------------------

/// When the streak counters go back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreakReset {
    /// Only an answer with the opposite outcome resets a streak.  Every
    /// answer that keeps a streak at or above the threshold moves the
    /// difficulty again.
    #[default]
    OnOppositeOutcome,
    /// A streak also resets as soon as it changes the difficulty, so each
    /// step needs a fresh pair of answers.
    OnAdjustment,
}

// ---------------------------------------------------------------------------
// DifficultyChange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyChange {
    Raised,
    Lowered,
    Unchanged,
}

// ---------------------------------------------------------------------------
// AdaptiveDifficulty
// ---------------------------------------------------------------------------

/// The triple persisted across sessions.
///
/// ```
/// use digit_span::session::{AdaptiveDifficulty, DifficultyChange, StreakReset};
///
/// let mut adaptive = AdaptiveDifficulty::default();
/// adaptive.record_answer(true, StreakReset::default());
/// let change = adaptive.record_answer(true, StreakReset::default());
///
/// assert_eq!(change, DifficultyChange::Raised);
/// assert_eq!(adaptive.digit_count, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveDifficulty {
    pub digit_count: usize,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

impl Default for AdaptiveDifficulty {
    fn default() -> Self {
        Self {
            digit_count: MIN_DIGIT_COUNT,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
        }
    }
}

impl AdaptiveDifficulty {
    /// Read the persisted triple, repairing a digit count below the minimum.
    pub fn from_config(training: &TrainingConfig) -> Self {
        Self {
            digit_count: training.current_digit_count.max(MIN_DIGIT_COUNT),
            consecutive_correct: training.consecutive_correct,
            consecutive_incorrect: training.consecutive_incorrect,
        }
    }

    /// Write the triple back into `training`.
    pub fn write_to(&self, training: &mut TrainingConfig) {
        training.current_digit_count = self.digit_count;
        training.consecutive_correct = self.consecutive_correct;
        training.consecutive_incorrect = self.consecutive_incorrect;
    }

    /// Update the streaks for one scored answer and adjust the difficulty.
    pub fn record_answer(&mut self, correct: bool, reset: StreakReset) -> DifficultyChange {
        if correct {
            self.consecutive_correct += 1;
            self.consecutive_incorrect = 0;
        } else {
            self.consecutive_incorrect += 1;
            self.consecutive_correct = 0;
        }

        let mut change = DifficultyChange::Unchanged;

        if self.consecutive_correct >= STREAK_THRESHOLD {
            self.digit_count += 1;
            change = DifficultyChange::Raised;
            if reset == StreakReset::OnAdjustment {
                self.consecutive_correct = 0;
            }
        }

        if self.consecutive_incorrect >= STREAK_THRESHOLD && self.digit_count > MIN_DIGIT_COUNT {
            self.digit_count -= 1;
            change = DifficultyChange::Lowered;
            if reset == StreakReset::OnAdjustment {
                self.consecutive_incorrect = 0;
            }
        }

        change
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
