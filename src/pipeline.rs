// ==============================================================================
// pipeline.rs - Annotation Enrichment Pipeline
// ==============================================================================
// Description: Drives variant calls through conversion, chunking, concurrent
//              fetch, field resolution and aggregation
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-16
// Version: 1.1.1
// ==============================================================================
// Stages:
//   VCF -> VariantCall -> VariantId -> Batch -> RawAnnotation
//       -> ResolvedVariant -> ResultTable
// Resolution and aggregation only run once every batch has been fetched, so
// a failed run never yields a partial table unless partial mode is enabled.
// ==============================================================================

use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{aggregate, ResultTable};
use crate::chunker::chunk;
use crate::config::AnnotatorConfig;
use crate::error::{AnnotateError, Result};
use crate::events::{EventSink, PipelineEvent};
use crate::fetcher::{AnnotationFetcher, BatchFailure, FetchOptions};
use crate::models::{VariantCall, VariantId};
use crate::parsers::VcfReader;
use crate::resolver::resolve_all;
use crate::source::AnnotationSource;
use crate::validator::InputValidator;
use crate::variant_id::to_variant_id;

/// Result of one annotation run
#[derive(Debug, Default)]
pub struct AnnotationReport {
    pub table: ResultTable,

    /// Batches given up on (partial mode only)
    pub failures: Vec<BatchFailure>,

    /// Calls dropped because they could not be converted
    pub skipped_calls: usize,
}

pub struct AnnotationPipeline {
    config: AnnotatorConfig,
    fetcher: AnnotationFetcher,
    events: Arc<dyn EventSink>,
}

impl AnnotationPipeline {
    /// Validates `config` before anything touches the network
    pub fn new(
        config: AnnotatorConfig,
        source: Arc<dyn AnnotationSource>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let fetcher = AnnotationFetcher::new(source, FetchOptions::from(&config), Arc::clone(&events));

        Ok(Self {
            config,
            fetcher,
            events,
        })
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Validate, read and annotate a VCF file
    pub async fn annotate_file(&self, path: &Path) -> Result<AnnotationReport> {
        InputValidator::new().validate(path)?;

        let mut reader = VcfReader::new();
        let calls = reader.read(path)?;
        if reader.skipped_count > 0 || reader.error_count > 0 {
            self.events.report(PipelineEvent::RecordsIgnored {
                skipped: reader.skipped_count,
                errors: reader.error_count,
            });
        }

        self.events.report(PipelineEvent::CallsLoaded { count: calls.len() });
        self.annotate_calls(&calls).await
    }

    pub async fn annotate_calls(&self, calls: &[VariantCall]) -> Result<AnnotationReport> {
        let ids = self.identifiers(calls)?;
        let skipped_calls = calls.len() - ids.len();

        let mut report = self.annotate_ids(&ids).await?;
        report.skipped_calls = skipped_calls;
        Ok(report)
    }

    /// Convert calls to identifiers in call order
    ///
    /// A malformed call aborts unless `skip_invalid_calls` is set, in which
    /// case it is reported and left out.
    pub fn identifiers(&self, calls: &[VariantCall]) -> Result<Vec<VariantId>> {
        let mut ids = Vec::with_capacity(calls.len());
        let mut skipped = 0;

        for (index, call) in calls.iter().enumerate() {
            match to_variant_id(call) {
                Ok(id) => ids.push(id),
                Err(e) if self.config.skip_invalid_calls => {
                    self.events.report(PipelineEvent::CallSkipped {
                        index,
                        call: call.to_string(),
                        reason: e.to_string(),
                    });
                    skipped += 1;
                }
                Err(e) => {
                    return Err(AnnotateError::Conversion {
                        index,
                        call: call.to_string(),
                        source: e,
                    });
                }
            }
        }

        self.events.report(PipelineEvent::IdsConverted {
            count: ids.len(),
            skipped,
        });
        Ok(ids)
    }

    /// Fetch, resolve and aggregate annotations for `ids`
    pub async fn annotate_ids(&self, ids: &[VariantId]) -> Result<AnnotationReport> {
        let batches = chunk(ids, self.config.chunk_size)?;
        self.events.report(PipelineEvent::BatchesPlanned {
            ids: ids.len(),
            batches: batches.len(),
            chunk_size: self.config.chunk_size,
        });

        let outcome = self.fetcher.fetch_all(batches, &self.config.fields).await?;

        let resolved = resolve_all(&outcome.records);
        self.events.report(PipelineEvent::Resolved { rows: resolved.len() });

        Ok(AnnotationReport {
            table: aggregate(resolved),
            failures: outcome.failures,
            skipped_calls: 0,
        })
    }
}
