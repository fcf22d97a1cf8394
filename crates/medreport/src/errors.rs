use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failures of one analysis request. All four transition the
/// lifecycle to `Failed` and are surfaced with a retry affordance; none of
/// them crash the surrounding application.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AnalysisError {
    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out, try again later")]
    Timeout,

    #[error("failed to parse server response: {0}")]
    ResponseParse(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::Server {
            status: 502,
            message: "model unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "server error: 502 - model unavailable");
        assert_eq!(
            AnalysisError::Timeout.to_string(),
            "request timed out, try again later"
        );
    }

    #[test]
    fn test_error_serialization_round_trip() {
        let err = AnalysisError::ResponseParse("missing field".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: AnalysisError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
