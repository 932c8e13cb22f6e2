mod help;
mod state;

use crate::cli::{build_config, build_workflow, Cli};
use crate::model::{StageMarker, View};
use crate::orchestrator::{self, UiCommand};
use crate::presenter::{ChannelPresenter, NoticeLevel, PresenterEvent};
use crate::render::Rgb;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};
use state::{handle_key, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const STAGE_LABELS: [&str; 3] = ["Data collection", "Analysis", "Report generation"];

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    // Unbounded channels avoid backpressure between the workflow and the render loop.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PresenterEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let presenter = Arc::new(ChannelPresenter::new(event_tx));
    let (workflow, client) = build_workflow(&cfg, presenter)?;

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let notice_duration = cfg.notice_duration;
    let ui_handle =
        std::thread::spawn(move || run_threaded(notice_duration, event_rx, cmd_tx));

    let res = orchestrator::run_controller(workflow, client, cfg.request_timeout, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    notice_duration: Duration,
    mut event_rx: UnboundedReceiver<PresenterEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        notice_duration,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        let now = Instant::now();
        while let Ok(ev) = event_rx.try_recv() {
            state.apply(ev, now);
        }
        state.expire_notice(now);

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, now)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(cmd) = handle_key(&mut state, k) {
                    let quit = cmd == UiCommand::Quit;
                    let _ = cmd_tx.send(cmd);
                    if quit {
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let title = match state.view {
        View::Input => "New analysis",
        View::Loading => "Analyzing",
        View::Results => "Results",
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("Stock Analysis", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  ·  "),
        Span::styled(title, Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("stock-report"));
    f.render_widget(header, chunks[0]);

    match state.view {
        View::Input => draw_input(chunks[1], f, state),
        View::Loading => draw_loading(chunks[1], f, state, now),
        View::Results => draw_results(chunks[1], f, state, now),
    }

    let notice = match &state.notice {
        Some(active) => {
            let fg = match active.notice.level {
                NoticeLevel::Error => Color::Red,
                NoticeLevel::Info => Color::Green,
            };
            Paragraph::new(Span::styled(
                active.notice.message.clone(),
                Style::default().fg(fg),
            ))
        }
        None => Paragraph::new(""),
    };
    f.render_widget(
        notice.block(Block::default().borders(Borders::ALL).title("Status")),
        chunks[2],
    );

    f.render_widget(
        Paragraph::new(help::keys_line(
            state.view,
            state.download_enabled,
            state.notice.is_some(),
        )),
        chunks[3],
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let boxed = centered(area, 60, 8);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(3)].as_ref())
        .split(boxed);

    let intro = Paragraph::new(vec![
        Line::from("Enter an NSE or BSE stock symbol."),
        Line::from(Span::styled(
            "e.g. INFY.NS, TCS, RELIANCE.BO",
            Style::default().fg(Color::Gray),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(intro, rows[0]);

    let input = Paragraph::new(state.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Stock symbol"),
    );
    f.render_widget(input, rows[1]);

    if state.input_focused {
        let x = rows[1].x + 1 + state.input.chars().count() as u16;
        f.set_cursor_position((x.min(rows[1].right().saturating_sub(2)), rows[1].y + 1));
    }
}

fn stage_span(label: &'static str, marker: StageMarker) -> Span<'static> {
    match marker {
        StageMarker::Completed => Span::styled(
            format!("✓ {label}"),
            Style::default().fg(Color::Green),
        ),
        StageMarker::Active => Span::styled(
            format!("● {label}"),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        StageMarker::Pending => {
            Span::styled(format!("○ {label}"), Style::default().fg(Color::DarkGray))
        }
    }
}

fn draw_loading(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let boxed = centered(area, 70, 10);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(boxed);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(f64::from(state.progress_percent) / 100.0)
        .label(format!("{}%", state.progress_percent));
    f.render_widget(gauge, rows[0]);

    let message = if state.progress_message.is_empty() {
        "Starting analysis..."
    } else {
        state.progress_message.as_str()
    };
    f.render_widget(
        Paragraph::new(message).alignment(Alignment::Center),
        rows[1],
    );

    let mut spans = Vec::new();
    for (i, (label, marker)) in STAGE_LABELS.iter().zip(state.stages.iter()).enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(stage_span(*label, *marker));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        rows[2],
    );

    if let Some(since) = state.loading_since {
        let secs = now.saturating_duration_since(since).as_secs();
        f.render_widget(
            Paragraph::new(Span::styled(
                format!("Elapsed: {secs}s"),
                Style::default().fg(Color::Gray),
            ))
            .alignment(Alignment::Center),
            rows[3],
        );
    }
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(0)].as_ref())
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[0]);

    let mut company_lines = Vec::new();
    if let Some(c) = &state.company {
        company_lines.push(Line::from(Span::styled(
            c.ticker.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        company_lines.push(Line::from(c.name.clone()));
        let sector = [c.sector.as_deref(), c.industry.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");
        if !sector.is_empty() {
            company_lines.push(Line::from(Span::styled(
                sector,
                Style::default().fg(Color::Gray),
            )));
        }
    }
    if let Some(p) = &state.price {
        company_lines.push(Line::from(""));
        let mut price_spans = vec![
            Span::styled("Price: ", Style::default().fg(Color::Gray)),
            Span::styled(p.current.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ];
        if let Some(change) = &p.change {
            let fg = if change.starts_with('-') {
                Color::Red
            } else {
                Color::Green
            };
            price_spans.push(Span::raw("  "));
            price_spans.push(Span::styled(change.clone(), Style::default().fg(fg)));
        }
        company_lines.push(Line::from(price_spans));
        if let Some(range) = &p.range_52w {
            company_lines.push(Line::from(vec![
                Span::styled("52w: ", Style::default().fg(Color::Gray)),
                Span::raw(range.clone()),
            ]));
        }
        if let Some(trend) = &p.trend {
            company_lines.push(Line::from(vec![
                Span::styled("Trend: ", Style::default().fg(Color::Gray)),
                Span::raw(trend.clone()),
            ]));
        }
    }
    f.render_widget(
        Paragraph::new(company_lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Company")),
        top[0],
    );

    let verdict_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(top[1]);

    if let Some(v) = &state.verdict {
        let (start, _) = v.style.gradient;
        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    v.label.clone(),
                    Style::default().fg(color(start)).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!(" {} ", v.style.badge_text),
                    Style::default()
                        .fg(Color::Black)
                        .bg(color(v.style.badge_color)),
                ),
            ]),
        ];
        if let Some(strength) = &v.strength {
            lines.push(Line::from(Span::styled(
                strength.clone(),
                Style::default().fg(Color::Gray),
            )));
        }
        if let Some(tally) = v.signal_tally() {
            lines.push(Line::from(vec![
                Span::styled("Signals: ", Style::default().fg(Color::Gray)),
                Span::raw(tally),
            ]));
        }
        if let Some(strategy) = &v.strategy {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("Strategy: ", Style::default().fg(Color::Gray)),
                Span::raw(strategy.clone()),
            ]));
        }
        f.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: true }).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color(v.style.badge_color)))
                    .title("Verdict"),
            ),
            verdict_area[0],
        );
    }

    if let Some(g) = &state.confidence {
        let gauge_color = state
            .verdict
            .as_ref()
            .map(|v| color(v.style.gradient.1))
            .unwrap_or(Color::Cyan);
        f.render_widget(
            Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Confidence"))
                .gauge_style(Style::default().fg(gauge_color))
                .ratio(state.confidence_fill(now).clamp(0.0, 1.0))
                .label(g.text.clone()),
            verdict_area[1],
        );
    }

    let signals: Vec<Line> = state
        .verdict
        .as_ref()
        .map(|v| {
            v.signals
                .iter()
                .map(|s| Line::from(format!("• {s}")))
                .collect()
        })
        .unwrap_or_default();
    let signals = if signals.is_empty() {
        vec![Line::from(Span::styled(
            "No signal breakdown in this report.",
            Style::default().fg(Color::Gray),
        ))]
    } else {
        signals
    };
    f.render_widget(
        Paragraph::new(signals)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Signals")),
        main[1],
    );
}
