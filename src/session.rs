use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DashboardError;
use crate::models::{Dataset, StudentRecord};
use crate::source::{DataOrigin, DatasetSource, LoadOutcome};

/// Issued when a load starts. Completions are applied only if their token is
/// newer than the last one applied, so a slow load can never clobber a
/// dataset that a later load already installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadToken(u64);

/// Owns the current dataset. The only writer is [`DashboardSession::complete_load`].
#[derive(Debug)]
pub struct DashboardSession {
    dataset: Arc<Dataset>,
    origin: DataOrigin,
    issued: u64,
    applied: u64,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self {
            dataset: Arc::new(Dataset::default()),
            origin: DataOrigin::Unavailable,
            issued: 0,
            applied: 0,
        }
    }
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for one rendering cycle.
    pub fn dataset(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    pub fn origin(&self) -> DataOrigin {
        self.origin
    }

    pub fn begin_load(&mut self) -> LoadToken {
        self.issued += 1;
        LoadToken(self.issued)
    }

    /// Installs the loaded dataset unless a newer load has already landed.
    pub fn complete_load(&mut self, token: LoadToken, outcome: LoadOutcome) -> bool {
        if token.0 <= self.applied {
            debug!(
                token = token.0,
                applied = self.applied,
                "discarding stale dataset load"
            );
            return false;
        }
        self.applied = token.0;
        self.origin = outcome.origin;
        self.dataset = Arc::new(outcome.dataset);
        info!(
            token = token.0,
            records = self.dataset.len(),
            origin = %self.origin,
            "dataset replaced"
        );
        true
    }

    pub async fn reload(&mut self, source: &DatasetSource) -> bool {
        let token = self.begin_load();
        let outcome = source.load().await;
        self.complete_load(token, outcome)
    }

    /// Resolves the selected student. A missing, blank or unknown ID is a
    /// selection error, not a data failure.
    pub fn select(&self, student_id: Option<&str>) -> Result<StudentRecord, DashboardError> {
        let id = student_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DashboardError::NoSelection)?;
        self.dataset
            .find(id)
            .cloned()
            .ok_or(DashboardError::NoSelection)
    }

    pub fn ensure_data(&self) -> Result<(), DashboardError> {
        if self.dataset.is_empty() {
            Err(DashboardError::DataUnavailable)
        } else {
            Ok(())
        }
    }
}
