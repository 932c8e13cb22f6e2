//! Workflow lifecycle controller.
//!
//! Owns the workflow, turns UI commands into transitions, and runs the pending
//! analysis request and any report download as their own tasks so the UI stays
//! live while they are in flight.

use super::workflow::WorkflowController;
use crate::delivery::{Delivered, DeliveryJob};
use crate::engine::{submit_within, AnalysisBackend};
use crate::error::WorkflowError;
use crate::model::{AnalysisReport, AnalysisRequest};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Analyze(String),
    NewAnalysis,
    Download,
    Quit,
}

type AnalysisTask = JoinHandle<Result<AnalysisReport, WorkflowError>>;
type DownloadTask = JoinHandle<Result<Delivered, WorkflowError>>;

fn spawn_analysis(
    backend: Arc<dyn AnalysisBackend>,
    request: AnalysisRequest,
    timeout: Option<Duration>,
) -> AnalysisTask {
    tokio::spawn(async move { submit_within(backend.as_ref(), &request, timeout).await })
}

/// The same caller-imposed limit as the analysis request bounds the download.
fn spawn_download(job: DeliveryJob, timeout: Option<Duration>) -> DownloadTask {
    tokio::spawn(async move {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, job.run()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(WorkflowError::delivery(format!(
                    "Could not download the report: no response within {}",
                    humantime::format_duration(limit)
                ))),
            },
            None => job.run().await,
        }
    })
}

/// Wait on an optional task; never resolves while there is none.
async fn join_opt<T>(task: &mut Option<JoinHandle<T>>) -> std::result::Result<T, tokio::task::JoinError> {
    match task.as_mut() {
        Some(h) => h.await,
        None => futures::future::pending().await,
    }
}

/// Drive the workflow from UI commands until quit or the command channel closes.
pub(crate) async fn run_controller(
    mut workflow: WorkflowController,
    backend: Arc<dyn AnalysisBackend>,
    request_timeout: Option<Duration>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    workflow.init();
    let mut pending: Option<AnalysisTask> = None;
    let mut downloading: Option<DownloadTask> = None;

    let res = loop {
        // Do not take a JoinHandle before its branch wins; otherwise it can be dropped
        // if another select branch is chosen, and we'll never observe completion.
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Analyze(input)) => {
                        // Only one request in flight; begin_analysis refuses outside Idle.
                        if let Ok(request) = workflow.begin_analysis(&input) {
                            pending = Some(spawn_analysis(backend.clone(), request, request_timeout));
                        }
                    }
                    Some(UiCommand::NewAnalysis) => {
                        if let Some(h) = downloading.take() {
                            h.abort();
                            tracing::info!("download abandoned for new analysis");
                        }
                        workflow.new_analysis();
                    }
                    Some(UiCommand::Download) => {
                        if downloading.is_some() {
                            tracing::debug!("download already running");
                        } else if let Ok(job) = workflow.download_job() {
                            downloading = Some(spawn_download(job, request_timeout));
                        }
                    }
                    Some(UiCommand::Quit) | None => break Ok(()),
                }
            }
            join_res = join_opt(&mut pending) => {
                pending = None;
                let outcome = match join_res {
                    Ok(outcome) => outcome,
                    Err(e) => Err(WorkflowError::transport(format!("analysis task failed: {e}"))),
                };
                workflow.complete_analysis(outcome);
                tracing::debug!(
                    state = ?workflow.state(),
                    view = ?workflow.active_view(),
                    report = workflow.has_report(),
                    "analysis settled"
                );
            }
            join_res = join_opt(&mut downloading) => {
                downloading = None;
                let outcome = match join_res {
                    Ok(outcome) => outcome,
                    Err(e) => Err(WorkflowError::delivery(format!("download task failed: {e}"))),
                };
                let _ = workflow.finish_download(outcome);
            }
        }
    };

    // Nothing else waits on these; stop them with the controller.
    if let Some(h) = pending.take() {
        h.abort();
    }
    if let Some(h) = downloading.take() {
        h.abort();
    }
    workflow.shutdown();
    res
}
