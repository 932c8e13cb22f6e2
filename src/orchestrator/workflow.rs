//! Analysis workflow state machine.
//!
//! `Idle --analyze--> Loading --settle--> Results | Idle`, and
//! `Results --new_analysis--> Idle`. A second analysis always starts from `Idle`.

use crate::delivery::{Delivered, DeliveryJob, ReportDeliveryManager};
use crate::engine::progress::{ProgressHandle, ProgressSimulator};
use crate::engine::{submit_within, AnalysisBackend};
use crate::error::WorkflowError;
use crate::model::{AnalysisReport, AnalysisRequest, View};
use crate::presenter::{Notice, Presenter};
use crate::render::ResultRenderer;
use crate::view::ViewController;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Loading,
    Results,
}

impl WorkflowState {
    pub fn view(self) -> View {
        match self {
            WorkflowState::Idle => View::Input,
            WorkflowState::Loading => View::Loading,
            WorkflowState::Results => View::Results,
        }
    }
}

pub struct WorkflowController {
    state: WorkflowState,
    views: ViewController,
    progress: ProgressSimulator,
    active_progress: Option<ProgressHandle>,
    renderer: ResultRenderer,
    delivery: ReportDeliveryManager,
    presenter: Arc<dyn Presenter>,
    pending_input: String,
}

impl WorkflowController {
    pub fn new(
        presenter: Arc<dyn Presenter>,
        progress: ProgressSimulator,
        renderer: ResultRenderer,
        delivery: ReportDeliveryManager,
    ) -> Self {
        Self {
            state: WorkflowState::Idle,
            views: ViewController::new(presenter.clone()),
            progress,
            active_progress: None,
            renderer,
            delivery,
            presenter,
            pending_input: String::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn active_view(&self) -> View {
        self.views.active()
    }

    pub fn has_report(&self) -> bool {
        self.delivery.has_report()
    }

    /// Paint the initial input screen.
    pub fn init(&mut self) {
        self.enter_idle();
        self.presenter.focus_input();
    }

    /// Validate the input and move to `Loading`.
    ///
    /// Returns the request the caller must send; the workflow is in `Loading` by the
    /// time this returns, before any network activity.
    pub fn begin_analysis(&mut self, raw_input: &str) -> Result<AnalysisRequest, WorkflowError> {
        if self.state != WorkflowState::Idle {
            tracing::warn!(state = ?self.state, "analyze ignored outside idle");
            return Err(WorkflowError::NotIdle {
                state: self.state.view(),
            });
        }

        let Some(request) = AnalysisRequest::from_input(raw_input) else {
            let err = WorkflowError::Validation;
            self.presenter.notify(Notice::error(err.to_string()));
            self.presenter.focus_input();
            return Err(err);
        };

        tracing::info!(symbol = %request.symbol, "analysis started");
        self.pending_input = raw_input.to_string();
        self.state = WorkflowState::Loading;
        self.views.show_view(View::Loading);
        self.active_progress = Some(self.progress.start());
        Ok(request)
    }

    /// Apply the settled outcome of the request started by [`Self::begin_analysis`].
    pub fn complete_analysis(&mut self, outcome: Result<AnalysisReport, WorkflowError>) {
        if self.state != WorkflowState::Loading {
            tracing::warn!(state = ?self.state, "stray analysis outcome dropped");
            return;
        }

        if let Some(handle) = self.active_progress.take() {
            self.progress.stop(handle);
        }

        match outcome {
            Ok(report) => {
                self.delivery
                    .set_handle(report.report_filename.clone(), report.report_data.clone());
                self.renderer
                    .render(self.presenter.as_ref(), &report, &self.pending_input);
                self.presenter.set_download_enabled(true);
                if let Some(message) = report.message.as_deref() {
                    self.presenter.notify(Notice::info(message));
                }
                self.state = WorkflowState::Results;
                self.views.show_view(View::Results);
                tracing::info!(verdict = %report.verdict.label, "results shown");
            }
            Err(err) => {
                tracing::warn!(error = ?err, "analysis failed");
                self.presenter.notify(Notice::error(err.to_string()));
                self.enter_idle();
                self.presenter.focus_input();
            }
        }
    }

    /// Run one full analysis cycle against `backend`, returning the settled report.
    pub async fn analyze(
        &mut self,
        backend: &dyn AnalysisBackend,
        raw_input: &str,
        timeout: Option<Duration>,
    ) -> Result<AnalysisReport, WorkflowError> {
        let request = self.begin_analysis(raw_input)?;
        let outcome = submit_within(backend, &request, timeout).await;
        self.complete_analysis(outcome.clone());
        outcome
    }

    /// Leave the results screen and get ready for another symbol.
    pub fn new_analysis(&mut self) {
        if self.state == WorkflowState::Loading {
            tracing::warn!("new analysis ignored while loading");
            return;
        }
        self.presenter.clear_input();
        self.enter_idle();
        self.presenter.focus_input();
        tracing::info!("workflow reset");
    }

    pub async fn download(&self) -> Result<Delivered, WorkflowError> {
        let job = self.download_job()?;
        self.finish_download(job.run().await)
    }

    /// Snapshot the current report for a download that runs off the workflow.
    pub fn download_job(&self) -> Result<DeliveryJob, WorkflowError> {
        self.delivery.job().inspect_err(|err| {
            self.presenter.notify(Notice::error(err.to_string()));
        })
    }

    /// Report the outcome of a download started with [`Self::download_job`].
    pub fn finish_download(
        &self,
        outcome: Result<Delivered, WorkflowError>,
    ) -> Result<Delivered, WorkflowError> {
        match &outcome {
            Ok(delivered) => {
                tracing::info!(via = ?delivered.via, "report downloaded");
                self.presenter.notify(Notice::info(format!(
                    "Report saved: {}",
                    delivered.path.display()
                )));
            }
            Err(err) => self.presenter.notify(Notice::error(err.to_string())),
        }
        outcome
    }

    /// Stop any running simulation, e.g. on shutdown.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.active_progress.take() {
            self.progress.stop(handle);
        }
    }

    fn enter_idle(&mut self) {
        self.delivery.clear();
        self.presenter.set_download_enabled(false);
        self.state = WorkflowState::Idle;
        self.pending_input.clear();
        self.progress.reset_visuals();
        self.views.show_view(View::Input);
    }
}
