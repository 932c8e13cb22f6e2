//! Maps a successful analysis onto the results screen.

use crate::model::{AnalysisReport, CompanyInfo, PriceInfo};
use crate::presenter::{CompanyLine, ConfidenceGauge, PriceLine, Presenter, VerdictCard};
use serde::Serialize;
use std::time::Duration;

pub const CURRENCY_SYMBOL: &str = "₹";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentBucket {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Fixed visual preset for one sentiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub gradient: (Rgb, Rgb),
    pub badge_text: &'static str,
    pub badge_color: Rgb,
}

impl SentimentBucket {
    pub fn style(self) -> StylePreset {
        match self {
            SentimentBucket::Bullish => StylePreset {
                gradient: (Rgb(16, 185, 129), Rgb(5, 150, 105)),
                badge_text: "BULLISH",
                badge_color: Rgb(16, 185, 129),
            },
            SentimentBucket::Neutral => StylePreset {
                gradient: (Rgb(245, 158, 11), Rgb(217, 119, 6)),
                badge_text: "NEUTRAL",
                badge_color: Rgb(245, 158, 11),
            },
            SentimentBucket::Bearish => StylePreset {
                gradient: (Rgb(239, 68, 68), Rgb(220, 38, 38)),
                badge_text: "BEARISH",
                badge_color: Rgb(239, 68, 68),
            },
        }
    }
}

/// Classify a verdict label. "BUY" wins over "HOLD"/"ACCUMULATE"; anything else is bearish.
pub fn classify_sentiment(label: &str) -> SentimentBucket {
    if label.contains("BUY") {
        SentimentBucket::Bullish
    } else if label.contains("HOLD") || label.contains("ACCUMULATE") {
        SentimentBucket::Neutral
    } else {
        SentimentBucket::Bearish
    }
}

/// Uppercase the raw input and drop the exchange suffix.
pub fn derive_ticker(raw_input: &str) -> String {
    raw_input
        .trim()
        .to_uppercase()
        .replacen(".NS", "", 1)
        .replacen(".BO", "", 1)
}

pub fn display_company_name(company: &CompanyInfo, ticker: &str) -> String {
    match company.company_name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("{ticker} Limited"),
    }
}

pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

pub(crate) fn format_price_line(price: &PriceInfo) -> PriceLine {
    let change = match (price.price_change, price.price_change_pct) {
        (Some(abs), Some(pct)) => Some(format!("{:+.2} ({:+.2}%)", abs, pct)),
        (None, Some(pct)) => Some(format!("{:+.2}%", pct)),
        (Some(abs), None) => Some(format!("{:+.2}", abs)),
        (None, None) => None,
    };
    let range_52w = match (price.low_52w, price.high_52w) {
        (Some(lo), Some(hi)) => Some(format!(
            "{CURRENCY_SYMBOL}{} - {CURRENCY_SYMBOL}{}",
            format_price(lo),
            format_price(hi)
        )),
        _ => None,
    };
    PriceLine {
        current: format!("{CURRENCY_SYMBOL}{}", format_price(price.current_price)),
        change,
        range_52w,
        trend: price.price_trend.clone(),
    }
}

pub struct ResultRenderer {
    confidence_delay: Duration,
}

impl ResultRenderer {
    pub fn new(confidence_delay: Duration) -> Self {
        Self { confidence_delay }
    }

    pub fn render(&self, presenter: &dyn Presenter, report: &AnalysisReport, raw_input: &str) {
        let ticker = derive_ticker(raw_input);
        presenter.paint_company(CompanyLine {
            name: display_company_name(&report.company, &ticker),
            ticker,
            sector: report.company.sector.clone(),
            industry: report.company.industry.clone(),
        });

        let verdict = &report.verdict;
        let bucket = classify_sentiment(&verdict.label);
        presenter.paint_verdict(VerdictCard {
            label: verdict.label.clone(),
            bucket,
            style: bucket.style(),
            strategy: verdict.strategy.clone(),
            strength: verdict.strength.clone(),
            signals: verdict.signals.clone(),
            positive_count: verdict.positive_count,
            total_signals: verdict.total_signals,
        });

        let percent = verdict.confidence_percent.min(100);
        presenter.paint_confidence(ConfidenceGauge {
            percent,
            text: format!("{percent}%"),
            fill_ratio: f64::from(percent) / 100.0,
            fill_delay: self.confidence_delay,
        });

        presenter.paint_price(format_price_line(&report.price));
    }
}
