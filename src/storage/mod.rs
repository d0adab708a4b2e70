//! Persistence — training history, statistics, the adaptive triple and
//! export / import.
//!
//! The session engine never writes here itself; the trainer loop turns
//! its `PersistAdaptive` effects and finished-session summaries into
//! [`Store`] calls.

pub mod records;
pub mod store;
pub mod transfer;

pub use records::{TrainingRecord, UserStats};
pub use store::{FileStore, MemoryStore, Store, StoreError};
pub use transfer::{
    export_all, export_file_name, export_json, import_data, ConfigDocument, ExportData,
    ExportPayload, ImportError, ImportSummary, EXPORT_VERSION,
};
