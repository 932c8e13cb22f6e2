//! Presentation port.
//!
//! The workflow never touches a terminal directly. Everything it wants shown goes
//! through a [`Presenter`], which the TUI implements by forwarding events to its
//! render thread and the text mode implements by printing lines.

use crate::model::{StageMarker, View, STAGE_COUNT};
use crate::render::{SentimentBucket, StylePreset};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient, dismissable notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictCard {
    pub label: String,
    pub bucket: SentimentBucket,
    pub style: StylePreset,
    pub strategy: Option<String>,
    pub strength: Option<String>,
    pub signals: Vec<String>,
    pub positive_count: Option<u32>,
    pub total_signals: Option<u32>,
}

impl VerdictCard {
    /// "N/M positive" when the backend reported both counts.
    pub fn signal_tally(&self) -> Option<String> {
        match (self.positive_count, self.total_signals) {
            (Some(positive), Some(total)) => Some(format!("{positive}/{total} positive")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceGauge {
    pub percent: u8,
    pub text: String,
    /// 0.0 to 1.0.
    pub fill_ratio: f64,
    /// Cosmetic delay before the fill animates in.
    #[serde(with = "humantime_serde")]
    pub fill_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub current: String,
    pub change: Option<String>,
    pub range_52w: Option<String>,
    pub trend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyLine {
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Everything a presenter can be asked to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PresenterEvent {
    SetView(View),
    Progress { message: String, percent: u8 },
    Stages([StageMarker; STAGE_COUNT]),
    ResetProgress,
    Company(CompanyLine),
    Verdict(VerdictCard),
    Confidence(ConfidenceGauge),
    Price(PriceLine),
    DownloadEnabled(bool),
    ClearInput,
    FocusInput,
    Notify(Notice),
}

pub trait Presenter: Send + Sync {
    fn emit(&self, event: PresenterEvent);

    fn set_view(&self, view: View) {
        self.emit(PresenterEvent::SetView(view));
    }

    fn paint_progress(&self, message: &str, percent: u8) {
        self.emit(PresenterEvent::Progress {
            message: message.to_string(),
            percent,
        });
    }

    fn paint_stages(&self, stages: [StageMarker; STAGE_COUNT]) {
        self.emit(PresenterEvent::Stages(stages));
    }

    fn reset_progress(&self) {
        self.emit(PresenterEvent::ResetProgress);
    }

    fn paint_company(&self, company: CompanyLine) {
        self.emit(PresenterEvent::Company(company));
    }

    fn paint_verdict(&self, verdict: VerdictCard) {
        self.emit(PresenterEvent::Verdict(verdict));
    }

    fn paint_confidence(&self, gauge: ConfidenceGauge) {
        self.emit(PresenterEvent::Confidence(gauge));
    }

    fn paint_price(&self, price: PriceLine) {
        self.emit(PresenterEvent::Price(price));
    }

    fn set_download_enabled(&self, enabled: bool) {
        self.emit(PresenterEvent::DownloadEnabled(enabled));
    }

    fn clear_input(&self) {
        self.emit(PresenterEvent::ClearInput);
    }

    fn focus_input(&self) {
        self.emit(PresenterEvent::FocusInput);
    }

    fn notify(&self, notice: Notice) {
        self.emit(PresenterEvent::Notify(notice));
    }
}

/// Forwards presenter events over an unbounded channel.
pub struct ChannelPresenter {
    tx: tokio::sync::mpsc::UnboundedSender<PresenterEvent>,
}

impl ChannelPresenter {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<PresenterEvent>) -> Self {
        Self { tx }
    }
}

impl Presenter for ChannelPresenter {
    fn emit(&self, event: PresenterEvent) {
        // Receiver gone means the UI is shutting down.
        let _ = self.tx.send(event);
    }
}
