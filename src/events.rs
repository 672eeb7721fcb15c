// ==============================================================================
// events.rs - Pipeline Progress Events
// ==============================================================================
// Description: Observability capability injected into pipeline components
// Author: Matt Barham
// Created: 2026-10-04
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use std::time::Duration;
use tracing::{debug, info, warn};

/// Something worth reporting while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    CallsLoaded { count: usize },
    /// VCF records left out: `skipped` had no ALT, `errors` could not be read
    RecordsIgnored { skipped: usize, errors: usize },
    IdsConverted { count: usize, skipped: usize },
    CallSkipped { index: usize, call: String, reason: String },
    BatchesPlanned { ids: usize, batches: usize, chunk_size: usize },
    BatchStarted { index: usize, size: usize },
    BatchRetrying { index: usize, attempt: u32, error: String },
    BatchCompleted { index: usize, records: usize, elapsed: Duration },
    BatchFailed { index: usize, error: String },
    FetchCompleted { records: usize, failed_batches: usize, elapsed: Duration },
    Resolved { rows: usize },
}

/// Receives pipeline events; must be shareable across fetch tasks
pub trait EventSink: Send + Sync {
    fn report(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn report(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::CallsLoaded { count } => {
                info!("Success! There are {} variant calls", count);
            }
            PipelineEvent::RecordsIgnored { skipped, errors } => {
                info!(
                    "Ignored {} records without ALT and {} unreadable records",
                    skipped, errors
                );
            }
            PipelineEvent::IdsConverted { count, skipped } => {
                if skipped > 0 {
                    warn!("Converted {} calls to identifiers ({} skipped)", count, skipped);
                } else {
                    info!("Converted {} calls to identifiers", count);
                }
            }
            PipelineEvent::CallSkipped { index, call, reason } => {
                warn!("Skipping call #{} ({}): {}", index, call, reason);
            }
            PipelineEvent::BatchesPlanned { ids, batches, chunk_size } => {
                info!("Querying {} variants in {} batches of up to {}", ids, batches, chunk_size);
            }
            PipelineEvent::BatchStarted { index, size } => {
                debug!("Batch {} started ({} ids)", index, size);
            }
            PipelineEvent::BatchRetrying { index, attempt, error } => {
                warn!("Batch {} failed, retry {}: {}", index, attempt, error);
            }
            PipelineEvent::BatchCompleted { index, records, elapsed } => {
                debug!(
                    "Batch {} completed: {} records in {:.2}s",
                    index,
                    records,
                    elapsed.as_secs_f64()
                );
            }
            PipelineEvent::BatchFailed { index, error } => {
                warn!("Batch {} failed: {}", index, error);
            }
            PipelineEvent::FetchCompleted { records, failed_batches, elapsed } => {
                if failed_batches > 0 {
                    warn!(
                        "Query finished with {} failed batches: {} records in {:.2} seconds",
                        failed_batches,
                        records,
                        elapsed.as_secs_f64()
                    );
                } else {
                    info!(
                        "Success! Query took {:.2} seconds ({} records)",
                        elapsed.as_secs_f64(),
                        records
                    );
                }
            }
            PipelineEvent::Resolved { rows } => {
                info!("Resolved {} annotation rows", rows);
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
    fn report(&self, _event: PipelineEvent) {}
}
