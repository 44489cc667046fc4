use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PredictorError;
use crate::models::{RiskLabel, StudentRecord};

pub const DEFAULT_RISK_THRESHOLD: f64 = 5.5;

/// Baseline rule: an explicit flag, or an AI index strictly above the threshold.
pub fn classify(record: &StudentRecord, threshold: f64) -> RiskLabel {
    if record.high_risk_flag == 1.0 || record.ai_dependency_index > threshold {
        RiskLabel::High
    } else {
        RiskLabel::Low
    }
}

/// External service that can override the baseline verdict for a student.
#[async_trait]
pub trait RiskPredictor: Send + Sync {
    async fn predict(&self, student_id: &str) -> Result<bool, PredictorError>;
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    predicted_risk: bool,
}

pub fn parse_prediction(body: &str) -> Result<bool, PredictorError> {
    let response: PredictionResponse = serde_json::from_str(body)?;
    Ok(response.predicted_risk)
}

/// `GET {base}/predict/{student_id}` returning `{ "predicted_risk": bool }`.
pub struct HttpPredictor {
    client: Client,
    base_url: String,
}

impl HttpPredictor {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RiskPredictor for HttpPredictor {
    async fn predict(&self, student_id: &str) -> Result<bool, PredictorError> {
        let url = format!(
            "{}/predict/{}",
            self.base_url.trim_end_matches('/'),
            student_id
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_prediction(&body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Predictor,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub label: RiskLabel,
    pub source: VerdictSource,
}

/// Classifies with an optional predictor. The predictor is asked once per
/// call, bounded by `timeout`; any failure falls back to [`classify`].
#[derive(Clone)]
pub struct Classifier {
    threshold: f64,
    predictor: Option<Arc<dyn RiskPredictor>>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            predictor: None,
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn RiskPredictor>, timeout: Duration) -> Self {
        self.predictor = Some(predictor);
        self.timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn baseline(&self, record: &StudentRecord) -> RiskLabel {
        classify(record, self.threshold)
    }

    pub async fn classify(&self, record: &StudentRecord) -> Verdict {
        let baseline = Verdict {
            label: self.baseline(record),
            source: VerdictSource::Baseline,
        };

        let Some(predictor) = &self.predictor else {
            return baseline;
        };

        let outcome = tokio::time::timeout(self.timeout, predictor.predict(&record.student_id))
            .await
            .unwrap_or(Err(PredictorError::Timeout(self.timeout)));

        match outcome {
            Ok(high) => {
                debug!(student_id = %record.student_id, high, "predictor verdict");
                Verdict {
                    label: if high { RiskLabel::High } else { RiskLabel::Low },
                    source: VerdictSource::Predictor,
                }
            }
            Err(err) => {
                warn!(
                    student_id = %record.student_id,
                    error = %err,
                    "predictor unavailable, using baseline"
                );
                baseline
            }
        }
    }
}
