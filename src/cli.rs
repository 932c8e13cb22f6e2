use crate::delivery::{DownloadDir, ReportDeliveryManager};
use crate::engine::progress::ProgressSimulator;
use crate::engine::AnalysisClient;
use crate::model::{default_progress_steps, ClientConfig};
use crate::orchestrator::WorkflowController;
use crate::presenter::{NoticeLevel, Presenter, PresenterEvent};
use crate::render::ResultRenderer;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "stock-report",
    version,
    about = "Submit a stock symbol, get a technical analysis verdict and PDF report"
)]
pub struct Cli {
    /// Base URL of the analysis service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Symbol to analyze non-interactively (requires --text or --json)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Print a text summary and exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Print the analysis as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// In text/JSON mode, also save the PDF report after a successful analysis
    #[arg(long)]
    pub download: bool,

    /// Directory reports are saved into (defaults to the user's download directory)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Interval between progress updates while waiting for the analysis
    #[arg(long, default_value = "1500ms")]
    pub step_interval: humantime::Duration,

    /// How long notifications stay on screen
    #[arg(long, default_value = "5s")]
    pub notice_duration: humantime::Duration,

    /// Delay before the confidence gauge fills
    #[arg(long, default_value = "100ms")]
    pub confidence_delay: humantime::Duration,

    /// Give up on the analysis request after this long (waits indefinitely when unset)
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// Append diagnostic logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.text || self.json
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.is_headless() && args.symbol.is_none() {
        return Err(anyhow::anyhow!(
            "--text and --json need a symbol. Use --symbol <SYMBOL>."
        ));
    }
    if args.symbol.is_some() && !args.is_headless() {
        return Err(anyhow::anyhow!(
            "--symbol is only used with --text or --json."
        ));
    }

    crate::logging::init(&args.log_level, args.log_file.as_deref(), args.is_headless())?;

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            return Err(anyhow::anyhow!(
                "built without the TUI; use --symbol with --text or --json"
            ));
        }
    }

    run_headless(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    let download_dir = args
        .download_dir
        .clone()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    ClientConfig {
        base_url: args.base_url.clone(),
        step_interval: Duration::from(args.step_interval),
        notice_duration: Duration::from(args.notice_duration),
        confidence_delay: Duration::from(args.confidence_delay),
        request_timeout: args.request_timeout.map(Duration::from),
        download_dir,
        user_agent: format!("stock-report-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Assemble the workflow and the HTTP client it talks to.
pub(crate) fn build_workflow(
    cfg: &ClientConfig,
    presenter: Arc<dyn Presenter>,
) -> Result<(WorkflowController, Arc<AnalysisClient>)> {
    let client = Arc::new(AnalysisClient::new(cfg)?);
    let sink = Arc::new(DownloadDir::new(cfg.download_dir.clone()));
    tracing::debug!(base_url = %client.base_url, download_dir = %sink.path().display(), "client configured");
    let progress =
        ProgressSimulator::new(default_progress_steps(), cfg.step_interval, presenter.clone());
    let delivery = ReportDeliveryManager::new(sink, client.clone());
    let workflow = WorkflowController::new(
        presenter,
        progress,
        ResultRenderer::new(cfg.confidence_delay),
        delivery,
    );
    Ok((workflow, client))
}

/// Presenter for text/JSON mode. Errors are returned to the caller, so only progress
/// and informational notices are printed, both to stderr.
struct ConsolePresenter {
    out: mpsc::UnboundedSender<OutputLine>,
    show_progress: bool,
}

impl Presenter for ConsolePresenter {
    fn emit(&self, event: PresenterEvent) {
        let line = match event {
            PresenterEvent::Progress { message, percent } if self.show_progress => {
                if message.is_empty() {
                    return;
                }
                format!("[{percent:>3}%] {message}")
            }
            PresenterEvent::Notify(notice) if notice.level == NoticeLevel::Info => notice.message,
            _ => return,
        };
        let _ = self.out.send(OutputLine::Stderr(line));
    }
}

async fn run_headless(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let symbol = args.symbol.clone().context("missing --symbol")?;
    let (out_tx, out_handle) = spawn_output_writer();

    let presenter = Arc::new(ConsolePresenter {
        out: out_tx.clone(),
        show_progress: args.text,
    });
    let (mut workflow, client) = build_workflow(&cfg, presenter)?;
    workflow.init();

    let res = run_once(&args, &mut workflow, client.as_ref(), &symbol, &cfg, &out_tx).await;

    workflow.shutdown();
    drop(workflow);
    drop(out_tx);
    let _ = out_handle.await;
    res
}

async fn run_once(
    args: &Cli,
    workflow: &mut WorkflowController,
    client: &AnalysisClient,
    symbol: &str,
    cfg: &ClientConfig,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let report = workflow
        .analyze(client, symbol, cfg.request_timeout)
        .await?;

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("serialize analysis")?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&report, symbol);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    if args.download {
        workflow.download().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Cli::parse_from(["stock-report", "--download-dir", "/tmp/reports"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.step_interval, Duration::from_millis(1500));
        assert_eq!(cfg.notice_duration, Duration::from_secs(5));
        assert_eq!(cfg.confidence_delay, Duration::from_millis(100));
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/reports"));
        assert!(cfg.user_agent.starts_with("stock-report-cli/"));
    }

    #[test]
    fn durations_parse_humantime() {
        let args = Cli::parse_from([
            "stock-report",
            "--step-interval",
            "250ms",
            "--request-timeout",
            "2m",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.step_interval, Duration::from_millis(250));
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn text_and_json_conflict() {
        assert!(Cli::try_parse_from(["stock-report", "--text", "--json"]).is_err());
    }

    #[tokio::test]
    async fn headless_without_symbol_is_rejected() {
        let args = Cli::parse_from(["stock-report", "--json"]);
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("--symbol"));
    }

    #[tokio::test]
    async fn console_presenter_prints_progress_only_in_text_mode() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let quiet = ConsolePresenter {
            out: tx.clone(),
            show_progress: false,
        };
        quiet.paint_progress("Fetching stock data...", 10);
        quiet.notify(crate::presenter::Notice::error("boom"));
        assert!(rx.try_recv().is_err());

        let loud = ConsolePresenter {
            out: tx,
            show_progress: true,
        };
        loud.paint_progress("", 0);
        loud.paint_progress("Fetching stock data...", 10);
        loud.notify(crate::presenter::Notice::info("Report saved: x.pdf"));
        match rx.try_recv() {
            Ok(OutputLine::Stderr(line)) => assert_eq!(line, "[ 10%] Fetching stock data..."),
            _ => panic!("expected progress line"),
        }
        match rx.try_recv() {
            Ok(OutputLine::Stderr(line)) => assert_eq!(line, "Report saved: x.pdf"),
            _ => panic!("expected notice line"),
        }
        assert!(rx.try_recv().is_err());
    }
}
