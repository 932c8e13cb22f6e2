mod client;
pub mod progress;

pub use client::AnalysisClient;

use crate::error::WorkflowError;
use crate::model::{AnalysisReport, AnalysisRequest};
use bytes::Bytes;
use futures::future::BoxFuture;
use std::time::Duration;

/// Something that can run an analysis for a symbol.
///
/// A single attempt per call; implementations never retry and never impose a
/// timeout of their own.
pub trait AnalysisBackend: Send + Sync {
    fn submit<'a>(
        &'a self,
        request: &'a AnalysisRequest,
    ) -> BoxFuture<'a, Result<AnalysisReport, WorkflowError>>;
}

/// Server side copy of generated reports, addressed by filename.
pub trait ReportSource: Send + Sync {
    fn fetch<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, anyhow::Result<Bytes>>;
}

/// Submit `request`, giving up after `limit` when one is configured.
pub async fn submit_within(
    backend: &dyn AnalysisBackend,
    request: &AnalysisRequest,
    limit: Option<Duration>,
) -> Result<AnalysisReport, WorkflowError> {
    let call = backend.submit(request);
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(WorkflowError::transport(format!(
                "no response within {}",
                humantime::format_duration(limit)
            ))),
        },
        None => call.await,
    }
}
