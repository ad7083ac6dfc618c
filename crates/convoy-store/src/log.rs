//! Transition log collaborator.

use std::sync::Arc;

use convoy_core::types::LogEntry;

use crate::db::Database;

/// Append-only sink for state transitions.
///
/// Appends are best-effort from the caller's point of view: a failed append
/// never fails the state mutation it trails, so duplicate or missing
/// entries are possible and tolerated.
pub trait TransitionLog: Send + Sync {
    fn append(&self, entry: &LogEntry) -> anyhow::Result<()>;
}

/// Default log backed by the store's own database.
#[derive(Debug, Clone)]
pub struct SqliteLog {
    db: Arc<Database>,
}

impl SqliteLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl TransitionLog for SqliteLog {
    fn append(&self, entry: &LogEntry) -> anyhow::Result<()> {
        self.db.append_log(entry)?;
        Ok(())
    }
}
