//! Error taxonomy for the analysis workflow.
//!
//! Every variant renders the message shown to the user; none of them is fatal.

use crate::model::View;
use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Please enter a stock symbol";
pub const CONNECTION_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const APPLICATION_FALLBACK_MESSAGE: &str = "Analysis failed. Please try again.";
pub const NO_REPORT_MESSAGE: &str = "No report available. Please run an analysis first.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Empty or whitespace-only symbol.
    #[error("{VALIDATION_MESSAGE}")]
    Validation,

    /// Backend unreachable or its payload could not be parsed.
    #[error("{CONNECTION_MESSAGE}")]
    Transport { detail: String },

    /// Backend answered with `success: false`.
    #[error("{message}")]
    Application { message: String },

    /// No report to hand out, or every delivery strategy failed.
    #[error("{message}")]
    Delivery { message: String },

    /// An analyze action arrived while the workflow was not idle.
    #[error("An analysis is already {state:?}")]
    NotIdle { state: View },
}

impl WorkflowError {
    pub fn transport(detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            detail: detail.to_string(),
        }
    }

    /// Build an application error, using the fallback text when the server sent none.
    pub fn application(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| APPLICATION_FALLBACK_MESSAGE.to_string());
        Self::Application { message }
    }

    pub fn no_report() -> Self {
        Self::Delivery {
            message: NO_REPORT_MESSAGE.to_string(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_hides_detail_from_user_message() {
        let e = WorkflowError::transport("connection refused (os error 111)");
        assert_eq!(e.to_string(), CONNECTION_MESSAGE);
    }

    #[test]
    fn application_uses_server_message_or_fallback() {
        assert_eq!(
            WorkflowError::application(Some("Invalid symbol".into())).to_string(),
            "Invalid symbol"
        );
        assert_eq!(
            WorkflowError::application(None).to_string(),
            APPLICATION_FALLBACK_MESSAGE
        );
        assert_eq!(
            WorkflowError::application(Some("  ".into())).to_string(),
            APPLICATION_FALLBACK_MESSAGE
        );
    }
}
