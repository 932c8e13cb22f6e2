//! Report retrieval.
//!
//! Delivery is an ordered list of strategies tried until one succeeds: save the
//! payload that came embedded in the analysis response, then fall back to fetching
//! the file from the server by name.

use crate::engine::ReportSource;
use crate::error::WorkflowError;
use crate::model::ReportHandle;
use anyhow::{Context, Result};
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_REPORT_FILENAME: &str = "stock_analysis_report.pdf";
pub const PDF_MIME: &str = "application/pdf";

/// Downloadable document with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBlob {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ReportBlob {
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            mime: PDF_MIME,
            bytes,
        }
    }

    /// Decode a base64 payload into a PDF blob.
    pub fn from_base64_pdf(data: &str) -> Result<Self> {
        let cleaned: String = data.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .context("decode embedded report")?;
        Ok(Self::pdf(bytes))
    }
}

/// Local destination for retrieved reports.
pub trait ReportSink: Send + Sync {
    fn save(&self, filename: &str, blob: &ReportBlob) -> Result<PathBuf>;
}

/// Writes reports into a directory.
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Keep only the final path component so a server supplied name cannot escape the directory.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    if name.is_empty() {
        DEFAULT_REPORT_FILENAME.to_string()
    } else {
        name
    }
}

impl ReportSink for DownloadDir {
    fn save(&self, filename: &str, blob: &ReportBlob) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create download dir {}", self.dir.display()))?;
        let path = self.dir.join(sanitize_filename(filename));
        std::fs::write(&path, &blob.bytes)
            .with_context(|| format!("write report {}", path.display()))?;
        tracing::debug!(mime = blob.mime, bytes = blob.bytes.len(), path = %path.display(), "report written");
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    /// Save the payload embedded in the analysis response.
    EmbeddedSave,
    /// Fetch the file from the server download endpoint.
    EndpointFetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub path: PathBuf,
    pub via: DeliveryStrategy,
}

/// Which strategies apply to a handle, in the order they are tried.
pub fn delivery_plan(handle: &ReportHandle) -> Vec<DeliveryStrategy> {
    let mut plan = Vec::with_capacity(2);
    if handle.embedded_data.is_some() {
        plan.push(DeliveryStrategy::EmbeddedSave);
    }
    if handle.has_filename() {
        plan.push(DeliveryStrategy::EndpointFetch);
    }
    plan
}

pub struct ReportDeliveryManager {
    handle: Option<ReportHandle>,
    sink: Arc<dyn ReportSink>,
    source: Arc<dyn ReportSource>,
}

impl ReportDeliveryManager {
    pub fn new(sink: Arc<dyn ReportSink>, source: Arc<dyn ReportSource>) -> Self {
        Self {
            handle: None,
            sink,
            source,
        }
    }

    pub fn has_report(&self) -> bool {
        self.handle.is_some()
    }

    /// Replace the current handle wholesale.
    pub fn set_handle(&mut self, filename: String, embedded_data: Option<String>) {
        self.handle = Some(ReportHandle {
            filename,
            embedded_data,
        });
    }

    pub fn clear(&mut self) {
        self.handle = None;
    }

    /// Snapshot the current handle into a job that can run on its own task.
    pub fn job(&self) -> Result<DeliveryJob, WorkflowError> {
        let Some(handle) = self.handle.clone() else {
            tracing::warn!("download requested with no report");
            return Err(WorkflowError::no_report());
        };
        Ok(DeliveryJob {
            handle,
            sink: self.sink.clone(),
            source: self.source.clone(),
        })
    }

    pub async fn download(&self) -> Result<Delivered, WorkflowError> {
        self.job()?.run().await
    }
}

/// One download of a specific report, detached from the manager.
pub struct DeliveryJob {
    handle: ReportHandle,
    sink: Arc<dyn ReportSink>,
    source: Arc<dyn ReportSource>,
}

impl DeliveryJob {
    pub async fn run(self) -> Result<Delivered, WorkflowError> {
        let plan = delivery_plan(&self.handle);
        if plan.is_empty() {
            return Err(WorkflowError::no_report());
        }

        let mut last_error = None;
        for strategy in plan {
            match self.attempt(strategy).await {
                Ok(path) => {
                    tracing::info!(?strategy, path = %path.display(), "report delivered");
                    return Ok(Delivered {
                        path,
                        via: strategy,
                    });
                }
                Err(e) => {
                    tracing::warn!(?strategy, error = %format!("{e:#}"), "report delivery attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| format!("{e:#}"))
            .unwrap_or_else(|| "unknown error".into());
        Err(WorkflowError::delivery(format!(
            "Could not download the report: {detail}"
        )))
    }

    async fn attempt(&self, strategy: DeliveryStrategy) -> Result<PathBuf> {
        let handle = &self.handle;
        match strategy {
            DeliveryStrategy::EmbeddedSave => {
                let data = handle
                    .embedded_data
                    .as_deref()
                    .context("no embedded report")?;
                let blob = ReportBlob::from_base64_pdf(data)?;
                let filename = if handle.has_filename() {
                    handle.filename.as_str()
                } else {
                    DEFAULT_REPORT_FILENAME
                };
                self.sink.save(filename, &blob)
            }
            DeliveryStrategy::EndpointFetch => {
                let bytes = self.source.fetch(&handle.filename).await?;
                self.sink
                    .save(&handle.filename, &ReportBlob::pdf(bytes.to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ReportSource for CountingSource {
        fn fetch<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<Bytes>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let body = format!("server:{filename}");
            async move {
                if fail {
                    anyhow::bail!("File not found");
                }
                Ok(Bytes::from(body))
            }
            .boxed()
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ReportSink for MemorySink {
        fn save(&self, filename: &str, blob: &ReportBlob) -> Result<PathBuf> {
            assert_eq!(blob.mime, PDF_MIME);
            self.saved
                .lock()
                .unwrap()
                .push((filename.to_string(), blob.bytes.clone()));
            Ok(PathBuf::from(filename))
        }
    }

    fn manager(sink: Arc<MemorySink>, source: Arc<CountingSource>) -> ReportDeliveryManager {
        ReportDeliveryManager::new(sink, source)
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn empty_handle_is_delivery_error_without_fetch() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let m = manager(sink.clone(), source.clone());

        let err = m.download().await.unwrap_err();
        assert_eq!(err, WorkflowError::no_report());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedded_data_is_saved_without_fetch() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle("INFY.pdf".into(), Some(b64(b"%PDF-embedded")));

        let delivered = m.download().await.unwrap();
        assert_eq!(delivered.via, DeliveryStrategy::EmbeddedSave);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            sink.saved.lock().unwrap().as_slice(),
            &[("INFY.pdf".to_string(), b"%PDF-embedded".to_vec())]
        );
    }

    #[tokio::test]
    async fn embedded_without_filename_uses_default_name() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle(String::new(), Some(b64(b"%PDF")));

        m.download().await.unwrap();
        assert_eq!(sink.saved.lock().unwrap()[0].0, DEFAULT_REPORT_FILENAME);
    }

    #[tokio::test]
    async fn bad_embedded_data_falls_back_to_endpoint() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle("TCS.pdf".into(), Some("!!not base64!!".into()));

        let delivered = m.download().await.unwrap();
        assert_eq!(delivered.via, DeliveryStrategy::EndpointFetch);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.saved.lock().unwrap()[0].1, b"server:TCS.pdf".to_vec());
    }

    #[tokio::test]
    async fn bad_embedded_data_without_filename_fails() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle(String::new(), Some("!!not base64!!".into()));

        let err = m.download().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Delivery { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filename_only_uses_endpoint() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle("RELIANCE.pdf".into(), None);

        let delivered = m.download().await.unwrap();
        assert_eq!(delivered.via, DeliveryStrategy::EndpointFetch);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_strategies_failing_is_delivery_error() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource {
            fail: true,
            ..Default::default()
        });
        let mut m = manager(sink, source.clone());
        m.set_handle("gone.pdf".into(), None);

        let err = m.download().await.unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[tokio::test]
    async fn replaced_handle_never_serves_stale_data() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source.clone());
        m.set_handle("first.pdf".into(), Some(b64(b"first")));
        m.set_handle("second.pdf".into(), None);

        m.download().await.unwrap();
        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved.as_slice(), &[("second.pdf".to_string(), b"server:second.pdf".to_vec())]);
    }

    #[tokio::test]
    async fn clear_drops_handle() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink, source);
        m.set_handle("x.pdf".into(), None);
        m.clear();
        assert!(!m.has_report());
        assert_eq!(m.download().await.unwrap_err(), WorkflowError::no_report());
        assert!(m.job().is_err());
    }

    #[tokio::test]
    async fn job_keeps_its_snapshot_after_clear() {
        let sink = Arc::new(MemorySink::default());
        let source = Arc::new(CountingSource::default());
        let mut m = manager(sink.clone(), source);
        m.set_handle("INFY.pdf".into(), Some(b64(b"%PDF")));
        let job = m.job().unwrap();
        m.clear();

        let delivered = job.run().await.unwrap();
        assert_eq!(delivered.via, DeliveryStrategy::EmbeddedSave);
        assert_eq!(
            sink.saved.lock().unwrap().as_slice(),
            &[("INFY.pdf".to_string(), b"%PDF".to_vec())]
        );
    }

    #[test]
    fn plan_order() {
        let both = ReportHandle {
            filename: "a.pdf".into(),
            embedded_data: Some("x".into()),
        };
        assert_eq!(
            delivery_plan(&both),
            vec![DeliveryStrategy::EmbeddedSave, DeliveryStrategy::EndpointFetch]
        );
        let none = ReportHandle {
            filename: " ".into(),
            embedded_data: None,
        };
        assert!(delivery_plan(&none).is_empty());
    }

    #[test]
    fn download_dir_writes_inside_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DownloadDir::new(tmp.path().join("reports"));
        let path = dir
            .save("../../etc/INFY.pdf", &ReportBlob::pdf(b"%PDF".to_vec()))
            .unwrap();
        assert_eq!(path, tmp.path().join("reports").join("INFY.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
    }
}
