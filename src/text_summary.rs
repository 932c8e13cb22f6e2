//! Text summary builder for CLI output.
//!
//! Formats the same fields the results screen shows as plain lines for text mode.

use crate::model::AnalysisReport;
use crate::render::{classify_sentiment, derive_ticker, display_company_name, format_price_line};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a settled report and the symbol as the user typed it.
pub(crate) fn build_text_summary(report: &AnalysisReport, raw_input: &str) -> TextSummary {
    let mut lines = Vec::new();

    let ticker = derive_ticker(raw_input);
    let name = display_company_name(&report.company, &ticker);
    lines.push(format!("{ticker}: {name}"));
    let sector = [report.company.sector.as_deref(), report.company.industry.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>();
    if !sector.is_empty() {
        lines.push(format!("Sector: {}", sector.join(" / ")));
    }

    let price = format_price_line(&report.price);
    match price.change.as_deref() {
        Some(change) => lines.push(format!("Price: {} {change}", price.current)),
        None => lines.push(format!("Price: {}", price.current)),
    }
    if let Some(range) = price.range_52w.as_deref() {
        lines.push(format!("52-week range: {range}"));
    }
    if let Some(trend) = price.trend.as_deref() {
        lines.push(format!("Trend: {trend}"));
    }

    let verdict = &report.verdict;
    let badge = classify_sentiment(&verdict.label).style().badge_text;
    lines.push(format!(
        "Verdict: {} ({badge}), confidence {}%",
        verdict.label,
        verdict.confidence_percent.min(100)
    ));
    if let Some(strength) = verdict.strength.as_deref() {
        lines.push(format!("Strength: {strength}"));
    }
    if let (Some(positive), Some(total)) = (verdict.positive_count, verdict.total_signals) {
        lines.push(format!("Signals: {positive}/{total} positive"));
    }
    for signal in &verdict.signals {
        lines.push(format!("  - {signal}"));
    }
    if let Some(strategy) = verdict.strategy.as_deref() {
        lines.push(format!("Strategy: {strategy}"));
    }

    lines.push(format!("Report: {}", report.report_filename));

    TextSummary { lines }
}
