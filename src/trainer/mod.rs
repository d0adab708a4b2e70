//! Trainer — the async event loop around the session engine, and the
//! shared view the UI renders from.

pub mod runner;
pub mod state;

pub use runner::{TrainerCommand, TrainerHandle, TrainerRunner};
pub use state::{new_shared_view, SharedView, TrainerView};
