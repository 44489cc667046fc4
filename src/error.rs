/// The only failures a user ever sees. Everything else degrades to a default.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("data unavailable")]
    DataUnavailable,
    #[error("please select a student first")]
    NoSelection,
    #[error("report generation failed: {source}")]
    ReportFailed {
        #[source]
        source: anyhow::Error,
    },
}

impl DashboardError {
    pub fn report_failed(source: impl Into<anyhow::Error>) -> Self {
        Self::ReportFailed {
            source: source.into(),
        }
    }
}

/// Reasons the external risk predictor could not produce a verdict.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("predictor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("predictor returned status {0}")]
    Status(u16),
    #[error("predictor response malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("predictor did not answer within {0:?}")]
    Timeout(std::time::Duration),
}
