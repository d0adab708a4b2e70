//! Persistence collaborator.
//!
//! [`Store`] holds the configuration (including the adaptive triple), the
//! append-only training history and the aggregate statistics.  Reads never
//! fail: a missing or corrupt file yields defaults.  Writes report
//! [`StoreError`].
//!
//! * [`FileStore`] — `settings.toml`, `records.json`, `stats.json` under
//!   [`AppPaths`].
//! * [`MemoryStore`] — in-process, for tests and portable runs.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, AppPaths};
use crate::session::{AdaptiveDifficulty, SessionSummary};

use super::records::{TrainingRecord, UserStats};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode data: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Read/write contract of the persistence collaborator.
pub trait Store: Send + Sync {
    fn config(&self) -> AppConfig;
    fn save_config(&self, config: &AppConfig) -> Result<(), StoreError>;

    fn records(&self) -> Vec<TrainingRecord>;
    fn save_records(&self, records: &[TrainingRecord]) -> Result<(), StoreError>;

    fn stats(&self) -> UserStats;
    fn save_stats(&self, stats: &UserStats) -> Result<(), StoreError>;

    /// Write the adaptive triple into the stored config.  Returns the
    /// updated config.
    fn save_adaptive(&self, adaptive: &AdaptiveDifficulty) -> Result<AppConfig, StoreError> {
        let mut config = self.config();
        adaptive.write_to(&mut config.training);
        self.save_config(&config)?;
        Ok(config)
    }

    /// Append a record for a finished session.
    fn save_training_record(&self, summary: &SessionSummary) -> Result<TrainingRecord, StoreError> {
        let record = TrainingRecord::from_summary(summary, Utc::now());
        let mut records = self.records();
        records.push(record.clone());
        self.save_records(&records)?;
        Ok(record)
    }

    /// Fold `record` into the statistics.
    fn update_user_stats(&self, record: &TrainingRecord) -> Result<UserStats, StoreError> {
        let stats = self.stats().with_record(record);
        self.save_stats(&stats)?;
        Ok(stats)
    }

    fn clear_records(&self) -> Result<(), StoreError> {
        self.save_records(&[])
    }

    fn reset_stats(&self) -> Result<UserStats, StoreError> {
        let stats = UserStats::default();
        self.save_stats(&stats)?;
        Ok(stats)
    }
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Store>) {}
};

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileStore {
    paths: AppPaths,
}

impl FileStore {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }
}

fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            log::warn!("storage: cannot read {}: {e}", path.display());
            return T::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("storage: {} is corrupt, using defaults: {e}", path.display());
        T::default()
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

impl Store for FileStore {
    fn config(&self) -> AppConfig {
        AppConfig::load_from(&self.paths.settings_file).unwrap_or_else(|e| {
            log::warn!("storage: settings unreadable, using defaults: {e}");
            AppConfig::default()
        })
    }

    fn save_config(&self, config: &AppConfig) -> Result<(), StoreError> {
        config.save_to(&self.paths.settings_file)?;
        Ok(())
    }

    fn records(&self) -> Vec<TrainingRecord> {
        read_json_or_default(&self.paths.records_file)
    }

    fn save_records(&self, records: &[TrainingRecord]) -> Result<(), StoreError> {
        write_json(&self.paths.records_file, records)
    }

    fn stats(&self) -> UserStats {
        read_json_or_default(&self.paths.stats_file)
    }

    fn save_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        write_json(&self.paths.stats_file, stats)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<AppConfig>,
    records: Mutex<Vec<TrainingRecord>>,
    stats: Mutex<UserStats>,
}

impl MemoryStore {
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
            ..Self::default()
        }
    }
}

/// A poisoned lock still holds usable data.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Store for MemoryStore {
    fn config(&self) -> AppConfig {
        lock(&self.config).clone()
    }

    fn save_config(&self, config: &AppConfig) -> Result<(), StoreError> {
        *lock(&self.config) = config.clone();
        Ok(())
    }

    fn records(&self) -> Vec<TrainingRecord> {
        lock(&self.records).clone()
    }

    fn save_records(&self, records: &[TrainingRecord]) -> Result<(), StoreError> {
        *lock(&self.records) = records.to_vec();
        Ok(())
    }

    fn stats(&self) -> UserStats {
        lock(&self.stats).clone()
    }

    fn save_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        *lock(&self.stats) = stats.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
