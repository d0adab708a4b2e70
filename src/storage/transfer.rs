//! Export / import of all training data as one JSON document.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "exportDate": "2024-03-01T10:00:00Z",
//!   "data": { "records": [...], "stats": {...}, "config": {...} }
//! }
//! ```
//!
//! Import appends the records (no de-duplication) and overwrites stats and
//! the training config when present.  A document without `version` or
//! without `data.records` is rejected before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TrainingConfig;

use super::records::{TrainingRecord, UserStats};
use super::store::{Store, StoreError};

pub const EXPORT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub data: ExportPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub records: Vec<TrainingRecord>,
    pub stats: UserStats,
    pub config: ConfigDocument,
}

/// [`TrainingConfig`] with the camelCase keys of the document format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDocument {
    pub display_duration: u64,
    pub digit_display_duration: u64,
    pub sequential_display: bool,
    pub current_digit_count: usize,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
    pub auto_continue: bool,
    pub auto_record: bool,
    pub auto_submit: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for ConfigDocument {
    fn from(c: &TrainingConfig) -> Self {
        Self {
            display_duration: c.display_duration_ms,
            digit_display_duration: c.digit_display_duration_ms,
            sequential_display: c.sequential_display,
            current_digit_count: c.current_digit_count,
            consecutive_correct: c.consecutive_correct,
            consecutive_incorrect: c.consecutive_incorrect,
            auto_continue: c.auto_continue,
            auto_record: c.auto_record,
            auto_submit: c.auto_submit,
        }
    }
}

impl From<ConfigDocument> for TrainingConfig {
    fn from(d: ConfigDocument) -> Self {
        Self {
            display_duration_ms: d.display_duration,
            digit_display_duration_ms: d.digit_display_duration,
            sequential_display: d.sequential_display,
            current_digit_count: d.current_digit_count,
            consecutive_correct: d.consecutive_correct,
            consecutive_incorrect: d.consecutive_incorrect,
            auto_continue: d.auto_continue,
            auto_record: d.auto_record,
            auto_submit: d.auto_submit,
        }
    }
}

/// Lenient shape used to validate an incoming document.
#[derive(Debug, Deserialize)]
struct IncomingDocument {
    version: Option<String>,
    data: Option<IncomingPayload>,
}

#[derive(Debug, Deserialize)]
struct IncomingPayload {
    records: Option<Vec<TrainingRecord>>,
    stats: Option<UserStats>,
    config: Option<ConfigDocument>,
}

// ---------------------------------------------------------------------------
// Errors / results
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    /// Malformed document; nothing was imported.
    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported_records: usize,
    pub stats_replaced: bool,
    pub config_replaced: bool,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Snapshot of everything in `store`.
pub fn export_all(store: &dyn Store) -> ExportData {
    ExportData {
        version: EXPORT_VERSION.into(),
        export_date: Utc::now(),
        data: ExportPayload {
            records: store.records(),
            stats: store.stats(),
            config: ConfigDocument::from(&store.config().training),
        },
    }
}

/// Export as pretty-printed JSON.
pub fn export_json(store: &dyn Store) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(&export_all(store))?)
}

/// `digit-span-backup-YYYY-MM-DD.json`.
pub fn export_file_name(date: DateTime<Utc>) -> String {
    format!("digit-span-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Merge the document `json` into `store`.
pub fn import_data(store: &dyn Store, json: &str) -> Result<ImportSummary, ImportError> {
    let doc: IncomingDocument =
        serde_json::from_str(json).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

    if doc.version.as_deref().map_or(true, str::is_empty) {
        return Err(ImportError::InvalidFormat("missing version".into()));
    }
    let payload = doc
        .data
        .ok_or_else(|| ImportError::InvalidFormat("missing data".into()))?;
    let incoming = payload
        .records
        .ok_or_else(|| ImportError::InvalidFormat("missing data.records".into()))?;

    let imported_records = incoming.len();
    let mut records = store.records();
    records.extend(incoming);
    store.save_records(&records)?;

    let stats_replaced = match payload.stats {
        Some(stats) => {
            store.save_stats(&stats)?;
            true
        }
        None => false,
    };

    let config_replaced = match payload.config {
        Some(training) => {
            let mut config = store.config();
            config.training = training.into();
            store.save_config(&config)?;
            true
        }
        None => false,
    };

    log::info!("storage: imported {imported_records} records");
    Ok(ImportSummary {
        imported_records,
        stats_replaced,
        config_replaced,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::session::SessionSummary;
    use crate::storage::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::default();
        let record = store
            .save_training_record(&SessionSummary {
                digit_count: 4,
                correct_count: 2,
                incorrect_count: 1,
            })
            .unwrap();
        store.update_user_stats(&record).unwrap();
        store
    }

    #[test]
    fn export_uses_document_keys() {
        let store = seeded_store();
        let json = export_json(&store).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "1.0");
        assert!(value["exportDate"].is_string());
        assert_eq!(value["data"]["records"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["data"]["stats"]["totalTrainings"], 1);
        assert_eq!(value["data"]["config"]["displayDuration"], 2000);
        assert_eq!(value["data"]["config"]["currentDigitCount"], 3);
    }

    #[test]
    fn import_appends_records_and_overwrites_stats_and_config() {
        let source = seeded_store();
        let mut config = AppConfig::default();
        config.training.current_digit_count = 8;
        config.training.auto_continue = true;
        source.save_config(&config).unwrap();
        let json = export_json(&source).unwrap();

        let target = seeded_store();
        let mut target_config = target.config();
        target_config.voice.rate = 2.0;
        target.save_config(&target_config).unwrap();

        let summary = import_data(&target, &json).unwrap();
        assert_eq!(summary.imported_records, 1);
        assert!(summary.stats_replaced);
        assert!(summary.config_replaced);

        assert_eq!(target.records().len(), 2);
        assert_eq!(target.stats(), source.stats());
        assert_eq!(target.config().training.current_digit_count, 8);
        assert!(target.config().training.auto_continue);
        // Only the training section comes from the document.
        assert_eq!(target.config().voice.rate, 2.0);
    }

    #[test]
    fn importing_twice_duplicates_records() {
        let json = export_json(&seeded_store()).unwrap();
        let target = MemoryStore::default();
        import_data(&target, &json).unwrap();
        import_data(&target, &json).unwrap();
        assert_eq!(target.records().len(), 2);
    }

    #[test]
    fn missing_records_is_rejected_without_changes() {
        let target = seeded_store();
        let before = target.records();
        let json = r#"{ "version": "1.0", "data": { "stats": { "totalTrainings": 99 } } }"#;

        let err = import_data(&target, json).unwrap_err();
        assert!(matches!(err, ImportError::InvalidFormat(_)));
        assert_eq!(target.records(), before);
        assert_eq!(target.stats().total_trainings, 1);
    }

    #[test]
    fn missing_version_is_rejected() {
        let target = MemoryStore::default();
        let json = r#"{ "data": { "records": [] } }"#;
        assert!(matches!(
            import_data(&target, json),
            Err(ImportError::InvalidFormat(_))
        ));
        let json = r#"{ "version": "", "data": { "records": [] } }"#;
        assert!(import_data(&target, json).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let target = MemoryStore::default();
        assert!(matches!(
            import_data(&target, "not json"),
            Err(ImportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn records_only_document_keeps_stats_and_config() {
        let target = seeded_store();
        let json = r#"{
            "version": "1.0",
            "data": { "records": [{
                "id": "a",
                "date": "2024-03-01T10:00:00.000Z",
                "digitCount": 5,
                "correctCount": 1,
                "incorrectCount": 0,
                "score": 5
            }] }
        }"#;

        let summary = import_data(&target, json).unwrap();
        assert_eq!(summary.imported_records, 1);
        assert!(!summary.stats_replaced);
        assert!(!summary.config_replaced);
        assert_eq!(target.stats().total_trainings, 1);
        assert_eq!(target.records()[1].id, "a");
    }

    #[test]
    fn file_name_contains_the_date() {
        let date = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(export_file_name(date), "digit-span-backup-2024-03-01.json");
    }
}
