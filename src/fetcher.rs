// ==============================================================================
// fetcher.rs - Concurrent Batch Annotation Fetch
// ==============================================================================
// Description: Scatter/gather of remote annotation queries, one task per batch
// Author: Matt Barham
// Created: 2026-10-04
// Modified: 2026-10-16
// Version: 1.3.0
// ==============================================================================
// Concurrency:
//   Every batch is spawned at once; a semaphore bounds how many talk to the
//   source at the same time. Results are slotted by submission position so
//   the concatenated output is in batch order whatever order tasks finish in.
//   Within a batch, records are put back in query order, since the source may
//   answer in any order.
//   Fail-fast mode aborts all outstanding tasks on the first failed batch.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::annotation::RawAnnotation;
use crate::config::{validate_fields, AnnotatorConfig, ConfigError, FailureMode};
use crate::events::{EventSink, PipelineEvent};
use crate::models::{Batch, VariantId};
use crate::source::{AnnotationSource, SourceError};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid fetch settings: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Batch {index} failed after {attempts} attempt(s): {source}")]
    Batch {
        index: usize,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    #[error("Batch task aborted: {0}")]
    Task(String),

    #[error("Annotation fetch timed out after {0:?}")]
    RunTimeout(Duration),
}

/// Batch that was given up on in partial mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub index: usize,
    pub ids: usize,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Records of all successful batches, concatenated in batch order
    pub records: Vec<RawAnnotation>,

    /// Always empty in fail-fast mode
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_concurrency: usize,
    pub batch_timeout: Option<Duration>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub failure_mode: FailureMode,
    pub run_timeout: Option<Duration>,
}

impl From<&AnnotatorConfig> for FetchOptions {
    fn from(config: &AnnotatorConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            batch_timeout: config.batch_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            failure_mode: config.failure_mode,
            run_timeout: config.run_timeout,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&AnnotatorConfig::default())
    }
}

impl FetchOptions {
    /// Zero permits would leave every batch waiting forever
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrency));
        }

        if self.batch_timeout.is_some_and(|t| t.is_zero())
            || self.run_timeout.is_some_and(|t| t.is_zero())
        {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

pub struct AnnotationFetcher {
    source: Arc<dyn AnnotationSource>,
    options: FetchOptions,
    events: Arc<dyn EventSink>,
}

impl AnnotationFetcher {
    pub fn new(
        source: Arc<dyn AnnotationSource>,
        options: FetchOptions,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source,
            options,
            events,
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Query every batch concurrently and gather the records in batch order
    ///
    /// In fail-fast mode the first batch that still fails after its retries
    /// aborts the whole fetch and nothing fetched so far is returned.
    /// Settings and fields are checked before any batch is sent.
    pub async fn fetch_all(
        &self,
        batches: Vec<Batch>,
        fields: &[String],
    ) -> Result<FetchOutcome, FetchError> {
        self.options.validate()?;
        validate_fields(fields)?;

        match self.options.run_timeout {
            Some(limit) => tokio::time::timeout(limit, self.gather(batches, fields))
                .await
                .map_err(|_| FetchError::RunTimeout(limit))?,
            None => self.gather(batches, fields).await,
        }
    }

    async fn gather(
        &self,
        batches: Vec<Batch>,
        fields: &[String],
    ) -> Result<FetchOutcome, FetchError> {
        let started = Instant::now();
        let total = batches.len();
        let fields: Arc<[String]> = Arc::from(fields);
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));

        let mut sizes = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (slot, batch) in batches.into_iter().enumerate() {
            sizes.push((batch.index, batch.len()));

            let source = Arc::clone(&self.source);
            let events = Arc::clone(&self.events);
            let fields = Arc::clone(&fields);
            let semaphore = Arc::clone(&semaphore);
            let options = self.options.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        fetch_batch(source.as_ref(), &batch, &fields, &options, events.as_ref())
                            .await
                            .map(|records| order_by_query(records, &batch.ids))
                    }
                    Err(e) => Err(FetchError::Task(format!("concurrency limiter closed: {}", e))),
                };
                (slot, result)
            });
        }

        let mut slots: Vec<Option<Vec<RawAnnotation>>> = (0..total).map(|_| None).collect();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (slot, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tasks.abort_all();
                    return Err(FetchError::Task(e.to_string()));
                }
            };

            match result {
                Ok(records) => slots[slot] = Some(records),
                Err(err) => {
                    let (index, ids) = sizes[slot];
                    self.events.report(PipelineEvent::BatchFailed {
                        index,
                        error: err.to_string(),
                    });

                    match self.options.failure_mode {
                        FailureMode::FailFast => {
                            tasks.abort_all();
                            return Err(err);
                        }
                        FailureMode::Partial => failures.push(BatchFailure {
                            index,
                            ids,
                            error: err.to_string(),
                        }),
                    }
                }
            }
        }

        failures.sort_by_key(|f| f.index);
        let records: Vec<RawAnnotation> = slots.into_iter().flatten().flatten().collect();

        self.events.report(PipelineEvent::FetchCompleted {
            records: records.len(),
            failed_batches: failures.len(),
            elapsed: started.elapsed(),
        });

        Ok(FetchOutcome { records, failures })
    }
}

/// Query one batch, retrying failed attempts with linear backoff
async fn fetch_batch(
    source: &dyn AnnotationSource,
    batch: &Batch,
    fields: &[String],
    options: &FetchOptions,
    events: &dyn EventSink,
) -> Result<Vec<RawAnnotation>, FetchError> {
    events.report(PipelineEvent::BatchStarted {
        index: batch.index,
        size: batch.len(),
    });

    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let result = match options.batch_timeout {
            Some(limit) => tokio::time::timeout(limit, source.query(&batch.ids, fields))
                .await
                .unwrap_or(Err(SourceError::Timeout(limit))),
            None => source.query(&batch.ids, fields).await,
        };

        match result {
            Ok(records) => {
                events.report(PipelineEvent::BatchCompleted {
                    index: batch.index,
                    records: records.len(),
                    elapsed: started.elapsed(),
                });
                return Ok(records);
            }
            Err(e) if attempt <= options.max_retries => {
                events.report(PipelineEvent::BatchRetrying {
                    index: batch.index,
                    attempt,
                    error: e.to_string(),
                });
                tokio::time::sleep(backoff_delay(options.retry_backoff, attempt)).await;
            }
            Err(e) => {
                return Err(FetchError::Batch {
                    index: batch.index,
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// Wait before retry `attempt`, saturating instead of overflowing
fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(attempt)
}

/// Stable sort of a batch's records by the position of their query in `ids`
///
/// Records for a query not in `ids` go last. Several records for the same
/// query stay together in the order they arrived.
fn order_by_query(mut records: Vec<RawAnnotation>, ids: &[VariantId]) -> Vec<RawAnnotation> {
    let mut positions: HashMap<&VariantId, usize> = HashMap::with_capacity(ids.len());
    for (position, id) in ids.iter().enumerate() {
        positions.entry(id).or_insert(position);
    }

    records.sort_by_key(|r| positions.get(&r.query).copied().unwrap_or(usize::MAX));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk;
    use crate::events::testing::RecordingEvents;
    use crate::events::NoopEvents;
    use crate::models::VariantId;
    use crate::source::testing::ScriptedSource;
    use serde_json::json;

    fn ids(n: usize) -> Vec<VariantId> {
        (1..=n).map(|i| VariantId::new(format!("chr1:g.{}A>G", i))).collect()
    }

    fn fields() -> Vec<String> {
        vec!["dbsnp.rsid".to_string()]
    }

    fn fetcher(source: Arc<ScriptedSource>, options: FetchOptions) -> AnnotationFetcher {
        AnnotationFetcher::new(source, options, Arc::new(NoopEvents))
    }

    #[tokio::test]
    async fn test_records_concatenated_in_batch_order() {
        let input = ids(23);
        let source = Arc::new(ScriptedSource::echo().with_delay(Duration::from_millis(5)));
        let options = FetchOptions {
            max_concurrency: 4,
            ..FetchOptions::default()
        };

        let outcome = fetcher(source.clone(), options)
            .fetch_all(chunk(&input, 5).unwrap(), &fields())
            .await
            .unwrap();

        let queries: Vec<VariantId> = outcome.records.iter().map(|r| r.query.clone()).collect();
        assert_eq!(queries, input);
        assert!(outcome.failures.is_empty());
        assert_eq!(source.calls(), 5);
    }

    #[tokio::test]
    async fn test_records_in_query_order_within_batch() {
        let input = ids(4);
        let source = Arc::new(ScriptedSource::echo().reversed());

        let outcome = fetcher(source, FetchOptions::default())
            .fetch_all(chunk(&input, 2).unwrap(), &fields())
            .await
            .unwrap();

        let queries: Vec<VariantId> = outcome.records.iter().map(|r| r.query.clone()).collect();
        assert_eq!(queries, input);
    }

    #[test]
    fn test_order_by_query() {
        let batch = ids(3);
        let record = |id: &str, tag: u32| RawAnnotation::new(id, json!({ "tag": tag }));
        let records = vec![
            record("chr1:g.3A>G", 0),
            record("chr9:g.1C>T", 1),
            record("chr1:g.1A>G", 2),
            record("chr1:g.3A>G", 3),
        ];

        let ordered = order_by_query(records, &batch);
        let order: Vec<(&str, Option<u64>)> = ordered
            .iter()
            .map(|r| (r.query.as_str(), r.lookup(&["tag"]).and_then(|v| v.as_u64())))
            .collect();

        assert_eq!(
            order,
            vec![
                ("chr1:g.1A>G", Some(2)),
                ("chr1:g.3A>G", Some(0)),
                ("chr1:g.3A>G", Some(3)),
                ("chr9:g.1C>T", Some(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_and_duplicate_records_pass_through() {
        let source = Arc::new(ScriptedSource::new(|id| {
            (id.as_str() != "chr1:g.2A>G").then(|| json!({}))
        }));

        let outcome = fetcher(source, FetchOptions::default())
            .fetch_all(chunk(&ids(3), 2).unwrap(), &fields())
            .await
            .unwrap();

        let queries: Vec<&str> = outcome.records.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["chr1:g.1A>G", "chr1:g.3A>G"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(ScriptedSource::echo().with_delay(Duration::from_millis(20)));
        let options = FetchOptions {
            max_concurrency: 2,
            ..FetchOptions::default()
        };

        let outcome = fetcher(source.clone(), options)
            .fetch_all(chunk(&ids(60), 10).unwrap(), &fields())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 60);
        assert!(source.max_in_flight() <= 2, "max in flight {}", source.max_in_flight());
    }

    #[tokio::test]
    async fn test_fail_fast_discards_completed_batches() {
        let input = ids(1200);
        // Second of three batches holds ids 501..=1000
        let source = Arc::new(ScriptedSource::echo().failing_on("chr1:g.700A>G"));

        let result = fetcher(source, FetchOptions::default())
            .fetch_all(chunk(&input, 500).unwrap(), &fields())
            .await;

        match result {
            Err(FetchError::Batch { index, attempts, source }) => {
                assert_eq!(index, 1);
                assert_eq!(attempts, 1);
                assert!(matches!(source, SourceError::Status { status: 500, .. }));
            }
            other => panic!("expected batch failure, got {:?}", other.map(|o| o.records.len())),
        }
    }

    #[tokio::test]
    async fn test_partial_mode_reports_failed_batches() {
        let input = ids(1200);
        let source = Arc::new(ScriptedSource::echo().failing_on("chr1:g.700A>G"));
        let events = Arc::new(RecordingEvents::default());
        let options = FetchOptions {
            failure_mode: FailureMode::Partial,
            ..FetchOptions::default()
        };

        let outcome = AnnotationFetcher::new(source, options, events.clone())
            .fetch_all(chunk(&input, 500).unwrap(), &fields())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 700);
        assert_eq!(outcome.records[499].query.as_str(), "chr1:g.500A>G");
        assert_eq!(outcome.records[500].query.as_str(), "chr1:g.1001A>G");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].ids, 500);

        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, PipelineEvent::BatchFailed { index: 1, .. })));
        assert!(events.events().iter().any(|e| matches!(
            e,
            PipelineEvent::FetchCompleted { records: 700, failed_batches: 1, .. }
        )));
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failures() {
        let source = Arc::new(ScriptedSource::echo().flaky(2));
        let events = Arc::new(RecordingEvents::default());
        let options = FetchOptions {
            max_concurrency: 1,
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..FetchOptions::default()
        };

        let outcome = AnnotationFetcher::new(source.clone(), options, events.clone())
            .fetch_all(chunk(&ids(4), 4).unwrap(), &fields())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 4);
        assert_eq!(source.calls(), 3);

        let retries = events
            .events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::BatchRetrying { .. }))
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let source = Arc::new(ScriptedSource::echo().flaky(5));
        let options = FetchOptions {
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
            ..FetchOptions::default()
        };

        let result = fetcher(source, options)
            .fetch_all(chunk(&ids(2), 2).unwrap(), &fields())
            .await;

        assert!(matches!(result, Err(FetchError::Batch { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn test_batch_timeout() {
        let source = Arc::new(ScriptedSource::echo().with_delay(Duration::from_secs(5)));
        let options = FetchOptions {
            batch_timeout: Some(Duration::from_millis(20)),
            ..FetchOptions::default()
        };

        let result = fetcher(source, options)
            .fetch_all(chunk(&ids(2), 1).unwrap(), &fields())
            .await;

        assert!(matches!(
            result,
            Err(FetchError::Batch { source: SourceError::Timeout(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let source = Arc::new(ScriptedSource::echo().with_delay(Duration::from_secs(5)));
        let options = FetchOptions {
            batch_timeout: None,
            run_timeout: Some(Duration::from_millis(20)),
            ..FetchOptions::default()
        };

        let result = fetcher(source, options)
            .fetch_all(chunk(&ids(2), 1).unwrap(), &fields())
            .await;

        assert!(matches!(result, Err(FetchError::RunTimeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_fetch() {
        let source = Arc::new(ScriptedSource::echo());

        let result = fetcher(source.clone(), FetchOptions::default())
            .fetch_all(chunk(&ids(2), 1).unwrap(), &[])
            .await;
        assert!(matches!(
            result,
            Err(FetchError::InvalidConfiguration(ConfigError::EmptyFields))
        ));

        let result = fetcher(source.clone(), FetchOptions::default())
            .fetch_all(chunk(&ids(2), 1).unwrap(), &["gnomad..af".to_string()])
            .await;
        assert!(matches!(
            result,
            Err(FetchError::InvalidConfiguration(ConfigError::InvalidField(_)))
        ));

        let options = FetchOptions {
            max_concurrency: 0,
            ..FetchOptions::default()
        };
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            fetcher(source.clone(), options).fetch_all(chunk(&ids(2), 1).unwrap(), &fields()),
        )
        .await
        .expect("zero concurrency must not wait for permits");
        assert!(matches!(
            result,
            Err(FetchError::InvalidConfiguration(ConfigError::InvalidConcurrency(0)))
        ));

        for options in [
            FetchOptions {
                batch_timeout: Some(Duration::ZERO),
                ..FetchOptions::default()
            },
            FetchOptions {
                run_timeout: Some(Duration::ZERO),
                ..FetchOptions::default()
            },
        ] {
            let result = fetcher(source.clone(), options)
                .fetch_all(chunk(&ids(2), 1).unwrap(), &fields())
                .await;
            assert!(matches!(
                result,
                Err(FetchError::InvalidConfiguration(ConfigError::ZeroTimeout))
            ));
        }

        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(Duration::from_millis(500), 3), Duration::from_millis(1500));
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
        assert_eq!(backoff_delay(Duration::from_secs(u64::MAX / 2), u32::MAX), Duration::MAX);
    }

    #[tokio::test]
    async fn test_no_batches() {
        let source = Arc::new(ScriptedSource::echo());
        let outcome = fetcher(source.clone(), FetchOptions::default())
            .fetch_all(Vec::new(), &fields())
            .await
            .unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(source.calls(), 0);
    }
}
