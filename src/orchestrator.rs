//! Ingest → gate → query → release.
//!
//! Entries are queried strictly one after another through a single
//! [`LocalMdmClient`]; the embedded-mode gate is acquired once for the whole
//! batch and restored when the batch ends, however it ends.

use std::path::PathBuf;
use std::thread::JoinHandle;

use crate::catalog::{CatalogEntry, DataSource};
use crate::error::{ProbeError, ProbeResult};
use crate::gate::{EmbeddedModeGate, FlagStore};
use crate::ingest::SchemaIngestion;
use crate::mdm::{LocalMdmClient, ManagementChannel, OutcomeKind};

/// Progress notification passed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Whole-number percentage, 0..=100.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total) as u32
    }
}

/// Counts for one query batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySummary {
    /// Entries sent to the channel.
    pub queried: usize,
    /// Status 200.
    pub applied: usize,
    /// Status 404.
    pub not_found: usize,
    /// Any other status, or a transport/registration failure.
    pub failed: usize,
    /// Not readable or without a path; never queried.
    pub skipped: usize,
}

impl QuerySummary {
    fn record(&mut self, kind: OutcomeKind) {
        self.queried += 1;
        match kind {
            OutcomeKind::Applied => self.applied += 1,
            OutcomeKind::NotFound => self.not_found += 1,
            OutcomeKind::Status(_) | OutcomeKind::Failed => self.failed += 1,
        }
    }
}

/// Result of a full ingest-and-query pass.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub source: DataSource,
    pub entries: Vec<CatalogEntry>,
    pub summary: QuerySummary,
}

/// Drives one ingestion source, one gate and one protocol client.
pub struct QueryOrchestrator<S: FlagStore, C: ManagementChannel> {
    ingestion: SchemaIngestion,
    gate: EmbeddedModeGate<S>,
    client: LocalMdmClient<C>,
    progress_interval: usize,
}

impl<S: FlagStore, C: ManagementChannel> QueryOrchestrator<S, C> {
    pub fn new(ingestion: SchemaIngestion, gate: EmbeddedModeGate<S>, channel: C) -> Self {
        Self {
            ingestion,
            gate,
            client: LocalMdmClient::new(channel),
            progress_interval: 20,
        }
    }

    /// Report progress every `interval` entries (and always on the last).
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn ingestion(&self) -> &SchemaIngestion {
        &self.ingestion
    }

    pub fn ingestion_mut(&mut self) -> &mut SchemaIngestion {
        &mut self.ingestion
    }

    pub fn gate(&self) -> &EmbeddedModeGate<S> {
        &self.gate
    }

    pub fn client(&self) -> &LocalMdmClient<C> {
        &self.client
    }

    /// Query every eligible entry in place.
    ///
    /// Per-entry failures are recorded on the entry. Only a threading-model
    /// failure from the channel aborts the batch; the gate is restored either
    /// way.
    pub fn query_all<F>(
        &mut self,
        entries: &mut [CatalogEntry],
        mut progress: F,
    ) -> ProbeResult<QuerySummary>
    where
        F: FnMut(Progress),
    {
        let mut summary = QuerySummary::default();
        let total = entries.len();
        if total == 0 {
            return Ok(summary);
        }

        let guard = self.gate.acquire()?;
        for (index, entry) in entries.iter_mut().enumerate() {
            if entry.is_readable() && !entry.path.trim().is_empty() {
                let outcome = match self.client.query_value(&entry.path) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        entry.clear_query_result();
                        return Err(err.into());
                    }
                };
                tracing::trace!(uri = %entry.path, value = %outcome.value, "queried");
                summary.record(outcome.kind);
                entry.set_query_result(outcome.value, outcome.success);
            } else {
                entry.clear_query_result();
                summary.skipped += 1;
            }

            let processed = index + 1;
            if processed % self.progress_interval == 0 || processed == total {
                progress(Progress { processed, total });
            }
        }
        guard.release();

        tracing::info!(
            queried = summary.queried,
            applied = summary.applied,
            not_found = summary.not_found,
            failed = summary.failed,
            skipped = summary.skipped,
            "query batch finished"
        );
        Ok(summary)
    }

    /// Load schemas through the ingestion tiers, then query them.
    pub fn run<F>(&mut self, local_files: &[PathBuf], progress: F) -> ProbeResult<RunReport>
    where
        F: FnMut(Progress),
    {
        let outcome = self.ingestion.load(local_files)?;
        tracing::info!(source = %outcome.source, count = outcome.entries.len(), "catalog loaded");

        let mut entries = outcome.entries;
        let summary = self.query_all(&mut entries, progress)?;
        Ok(RunReport {
            source: outcome.source,
            entries,
            summary,
        })
    }
}

impl<S, C> QueryOrchestrator<S, C>
where
    S: FlagStore + Send + 'static,
    C: ManagementChannel + Send + 'static,
{
    /// Run [`Self::run`] on a dedicated worker thread.
    ///
    /// The orchestrator moves to the worker and comes back through
    /// [`QueryWorker::join`], so its package cache survives the run.
    pub fn spawn<F>(
        self,
        local_files: Vec<PathBuf>,
        progress: F,
    ) -> std::io::Result<QueryWorker<S, C>>
    where
        F: FnMut(Progress) + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("cspscope-query".into())
            .spawn(move || {
                let mut orchestrator = self;
                let report = orchestrator.run(&local_files, progress);
                (orchestrator, report)
            })?;
        Ok(QueryWorker { handle })
    }
}

/// Handle to a background run.
pub struct QueryWorker<S: FlagStore, C: ManagementChannel> {
    handle: JoinHandle<(QueryOrchestrator<S, C>, ProbeResult<RunReport>)>,
}

impl<S: FlagStore, C: ManagementChannel> QueryWorker<S, C> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run and take back the orchestrator.
    pub fn join(self) -> ProbeResult<(QueryOrchestrator<S, C>, RunReport)> {
        let (orchestrator, report) = self.handle.join().map_err(|_| ProbeError::WorkerPanicked)?;
        Ok((orchestrator, report?))
    }
}
