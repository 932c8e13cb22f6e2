use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub step_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub notice_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub confidence_delay: Duration,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub download_dir: PathBuf,
    pub user_agent: String,
}

/// The three mutually exclusive screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Input,
    Loading,
    Results,
}

/// One cosmetic progress update shown while the analysis is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStep {
    pub message: String,
    pub percent_complete: u8,
    /// Coarse phase, 1 through 3.
    pub stage: u8,
}

impl ProgressStep {
    pub fn new(message: &str, percent_complete: u8, stage: u8) -> Self {
        Self {
            message: message.to_string(),
            percent_complete: percent_complete.min(100),
            stage: stage.clamp(1, STAGE_COUNT as u8),
        }
    }
}

pub const STAGE_COUNT: usize = 3;

/// The fixed sequence painted by the progress simulator.
pub fn default_progress_steps() -> Vec<ProgressStep> {
    vec![
        ProgressStep::new("Fetching stock data...", 10, 1),
        ProgressStep::new("Retrieving company details...", 25, 1),
        ProgressStep::new("Calculating technical indicators...", 40, 2),
        ProgressStep::new("Analyzing RSI and moving averages...", 55, 2),
        ProgressStep::new("Evaluating fundamentals...", 70, 2),
        ProgressStep::new("Generating verdict...", 85, 3),
        ProgressStep::new("Creating PDF report...", 100, 3),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMarker {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    #[serde(rename = "stock_name")]
    pub symbol: String,
}

impl AnalysisRequest {
    /// Build a request from raw user input. Returns `None` when the trimmed input is empty.
    pub fn from_input(raw: &str) -> Option<Self> {
        let symbol = raw.trim();
        if symbol.is_empty() {
            return None;
        }
        Some(Self {
            symbol: symbol.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictInfo {
    pub label: String,
    pub confidence_percent: u8,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub positive_count: Option<u32>,
    #[serde(default)]
    pub total_signals: Option<u32>,
}

impl Default for VerdictInfo {
    fn default() -> Self {
        Self {
            label: "HOLD".to_string(),
            confidence_percent: 50,
            strategy: None,
            strength: None,
            signals: Vec::new(),
            positive_count: None,
            total_signals: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub current_price: f64,
    #[serde(default)]
    pub price_change: Option<f64>,
    #[serde(default)]
    pub price_change_pct: Option<f64>,
    #[serde(default)]
    pub high_52w: Option<f64>,
    #[serde(default)]
    pub low_52w: Option<f64>,
    #[serde(default)]
    pub price_trend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Normalized successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub received_utc: String,
    pub verdict: VerdictInfo,
    pub price: PriceInfo,
    pub company: CompanyInfo,
    pub report_filename: String,
    /// Base64 PDF payload; never serialized into JSON output.
    #[serde(skip)]
    pub report_data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client-held reference to the most recently generated report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    pub filename: String,
    pub embedded_data: Option<String>,
}

impl ReportHandle {
    pub fn has_filename(&self) -> bool {
        !self.filename.trim().is_empty()
    }
}

/// Raw `/analyze` payload as the backend sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pdf_filename: Option<String>,
    #[serde(default)]
    pub pdf_data: Option<String>,
    #[serde(default)]
    pub results: Option<AnalysisResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AnalysisResults {
    #[serde(default)]
    pub company_details: Option<CompanyDetails>,
    #[serde(default)]
    pub verdict: Option<VerdictDetails>,
    #[serde(default)]
    pub price_analysis: Option<PriceAnalysis>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CompanyDetails {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VerdictDetails {
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub positive_count: Option<u32>,
    #[serde(default)]
    pub total_signals: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PriceAnalysis {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change: Option<f64>,
    #[serde(default)]
    pub price_change_pct: Option<f64>,
    #[serde(default)]
    pub high_52w: Option<f64>,
    #[serde(default)]
    pub low_52w: Option<f64>,
    #[serde(default)]
    pub price_trend: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl AnalysisResults {
    /// Fill every missing field with its display default.
    pub fn normalize(self) -> (VerdictInfo, PriceInfo, CompanyInfo) {
        let verdict = match self.verdict {
            Some(v) => VerdictInfo {
                label: non_empty(v.verdict).unwrap_or_else(|| "HOLD".to_string()),
                confidence_percent: v
                    .confidence
                    .filter(|c| c.is_finite())
                    .map(|c| c.round().clamp(0.0, 100.0) as u8)
                    .unwrap_or(50),
                strategy: non_empty(v.strategy),
                strength: non_empty(v.strength),
                signals: v.signals,
                positive_count: v.positive_count,
                total_signals: v.total_signals,
            },
            None => VerdictInfo::default(),
        };

        let price = match self.price_analysis {
            Some(p) => PriceInfo {
                current_price: p.current_price.filter(|v| v.is_finite()).unwrap_or(0.0),
                price_change: p.price_change,
                price_change_pct: p.price_change_pct,
                high_52w: p.high_52w,
                low_52w: p.low_52w,
                price_trend: non_empty(p.price_trend),
            },
            None => PriceInfo::default(),
        };

        let company = match self.company_details {
            Some(c) => CompanyInfo {
                company_name: non_empty(c.company_name),
                sector: non_empty(c.sector),
                industry: non_empty(c.industry),
            },
            None => CompanyInfo::default(),
        };

        (verdict, price, company)
    }
}
