// ==============================================================================
// source.rs - Variant Annotation Source
// ==============================================================================
// Description: Capability for querying a remote variant annotation database,
//              with the HTTP client for myvariant.info
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================
// References:
// - MyVariant.info API: https://docs.myvariant.info/en/latest/doc/variant_annotation_service.html
// ==============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::annotation::{AnnotationDecodeError, RawAnnotation};
use crate::models::VariantId;

/// Default public endpoint
pub const DEFAULT_ENDPOINT: &str = "https://myvariant.info/v1";

/// Errors from a single remote query
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Annotation source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed annotation payload: {0}")]
    Decode(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<AnnotationDecodeError> for SourceError {
    fn from(e: AnnotationDecodeError) -> Self {
        SourceError::Decode(e.to_string())
    }
}

/// A database that annotates batches of variant identifiers
///
/// Implementations must be safe to call from many in-flight tasks at once.
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    /// Submit identifiers and the field paths wanted for them
    ///
    /// The source may return zero, one or several records per identifier, in
    /// any order; each record carries the identifier it answers.
    async fn query(
        &self,
        ids: &[VariantId],
        fields: &[String],
    ) -> Result<Vec<RawAnnotation>, SourceError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "annotation-source"
    }
}

/// HTTP client for the myvariant.info batch annotation endpoint
#[derive(Debug, Clone)]
pub struct MyVariantClient {
    client: Client,
    endpoint: String,
}

impl MyVariantClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("variant-annotator/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, endpoint))
    }

    /// Reuse an existing client (shared connection pool)
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn variant_url(&self) -> String {
        format!("{}/variant", self.endpoint)
    }
}

#[async_trait]
impl AnnotationSource for MyVariantClient {
    async fn query(
        &self,
        ids: &[VariantId],
        fields: &[String],
    ) -> Result<Vec<RawAnnotation>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let form = build_form(ids, fields);
        debug!("POST {} ({} ids, {} fields)", self.variant_url(), ids.len(), fields.len());

        let response = self
            .client
            .post(self.variant_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        decode_payload(payload)
    }

    fn name(&self) -> &str {
        "myvariant.info"
    }
}

fn build_form(ids: &[VariantId], fields: &[String]) -> [(&'static str, String); 2] {
    let ids = ids.iter().map(VariantId::as_str).collect::<Vec<_>>().join(",");
    [("ids", ids), ("fields", fields.join(","))]
}

/// Decode a batch response body: a JSON array of records
pub fn decode_payload(payload: Value) -> Result<Vec<RawAnnotation>, SourceError> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .map(|item| RawAnnotation::from_json(item).map_err(SourceError::from))
            .collect(),
        Value::Object(map) if map.contains_key("error") => Err(SourceError::Decode(format!(
            "source reported error: {}",
            map.get("error").map(Value::to_string).unwrap_or_default()
        ))),
        _ => Err(SourceError::Decode("expected a JSON array of records".to_string())),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}
