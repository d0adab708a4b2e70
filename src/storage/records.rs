//! Training history and aggregate statistics.
//!
//! Both types serialise with camelCase keys so `records.json`, `stats.json`
//! and export documents read the same as those of the browser edition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{SessionSummary, MIN_DIGIT_COUNT};

// ---------------------------------------------------------------------------
// TrainingRecord
// ---------------------------------------------------------------------------

/// One finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    #[serde(default = "new_record_id")]
    pub id: String,
    /// When the session ended (RFC 3339).
    pub date: DateTime<Utc>,
    /// Difficulty reached at the end of the session.
    pub digit_count: usize,
    pub correct_count: u32,
    pub incorrect_count: u32,
    /// `correct_count × digit_count`.
    pub score: u64,
}

fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

impl TrainingRecord {
    pub fn from_summary(summary: &SessionSummary, date: DateTime<Utc>) -> Self {
        Self {
            id: new_record_id(),
            date,
            digit_count: summary.digit_count,
            correct_count: summary.correct_count,
            incorrect_count: summary.incorrect_count,
            score: summary.score(),
        }
    }

    pub fn questions(&self) -> u64 {
        u64::from(self.correct_count) + u64::from(self.incorrect_count)
    }
}

// ---------------------------------------------------------------------------
// UserStats
// ---------------------------------------------------------------------------

/// Totals over every recorded session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_trainings: u32,
    pub highest_digit_count: usize,
    pub total_correct: u64,
    pub total_questions: u64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_trainings: 0,
            highest_digit_count: MIN_DIGIT_COUNT,
            total_correct: 0,
            total_questions: 0,
        }
    }
}

impl UserStats {
    /// Percentage of correct answers, rounded.  0 before any question.
    ///
    /// ```
    /// use digit_span::storage::UserStats;
    ///
    /// let stats = UserStats { total_correct: 2, total_questions: 3, ..UserStats::default() };
    /// assert_eq!(stats.accuracy(), 67);
    /// assert_eq!(UserStats::default().accuracy(), 0);
    /// ```
    pub fn accuracy(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        (self.total_correct as f64 / self.total_questions as f64 * 100.0).round() as u32
    }

    /// Stats after adding `record`.
    pub fn with_record(&self, record: &TrainingRecord) -> Self {
        Self {
            total_trainings: self.total_trainings + 1,
            highest_digit_count: self.highest_digit_count.max(record.digit_count),
            total_correct: self.total_correct + u64::from(record.correct_count),
            total_questions: self.total_questions + record.questions(),
        }
    }
}
