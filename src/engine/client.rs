use super::{AnalysisBackend, ReportSource};
use crate::error::WorkflowError;
use crate::model::{AnalysisReport, AnalysisRequest, AnalyzeResponse, ClientConfig};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Url;

/// HTTP client for the analysis service.
#[derive(Clone)]
pub struct AnalysisClient {
    pub http: reqwest::Client,
    pub base_url: Url,
}

impl AnalysisClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base url: {}", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base url cannot carry paths: {}", cfg.base_url);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build http client")?;
        Ok(Self { http, base_url })
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn analyze_url(&self) -> Url {
        self.url_with_segments(&["analyze"])
    }

    /// `/download/<filename>`, with the filename encoded as a single segment.
    pub fn download_url(&self, filename: &str) -> Url {
        self.url_with_segments(&["download", filename])
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, WorkflowError> {
        let url = self.analyze_url();
        tracing::info!(symbol = %request.symbol, %url, "submitting analysis");

        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "analysis request failed");
                WorkflowError::transport(e)
            })?;

        // Error statuses still carry a JSON body with `success: false`.
        let status = resp.status();
        let body = resp.bytes().await.map_err(WorkflowError::transport)?;
        let payload: AnalyzeResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(%status, error = %e, "unparseable analysis response");
            WorkflowError::transport(e)
        })?;

        normalize_response(payload)
    }
}

/// Turn the raw payload into a report or an application error.
pub(crate) fn normalize_response(payload: AnalyzeResponse) -> Result<AnalysisReport, WorkflowError> {
    if !payload.success {
        tracing::info!(error = ?payload.error, "backend reported failure");
        return Err(WorkflowError::application(payload.error));
    }

    let (verdict, price, company) = payload.results.unwrap_or_default().normalize();
    let report = AnalysisReport {
        received_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        verdict,
        price,
        company,
        report_filename: payload.pdf_filename.unwrap_or_default(),
        report_data: payload.pdf_data.filter(|d| !d.is_empty()),
        message: payload.message,
    };
    tracing::info!(
        verdict = %report.verdict.label,
        confidence = report.verdict.confidence_percent,
        filename = %report.report_filename,
        embedded = report.report_data.is_some(),
        "analysis succeeded"
    );
    Ok(report)
}

impl AnalysisBackend for AnalysisClient {
    fn submit<'a>(
        &'a self,
        request: &'a AnalysisRequest,
    ) -> BoxFuture<'a, Result<AnalysisReport, WorkflowError>> {
        self.analyze(request).boxed()
    }
}

impl ReportSource for AnalysisClient {
    fn fetch<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<Bytes>> {
        async move {
            let url = self.download_url(filename);
            tracing::info!(%url, "fetching report from server");
            let resp = self
                .http
                .get(url)
                .send()
                .await
                .context("report download request failed")?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.bytes().await.unwrap_or_default();
                let message = serde_json::from_slice::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                    .unwrap_or_else(|| format!("server returned {status}"));
                anyhow::bail!(message);
            }
            resp.bytes().await.context("read report body")
        }
        .boxed()
    }
}
