use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PredictorError;

/// Optional answer model consulted for non-exact matches.
pub trait Predictor: Send + Sync {
    fn is_ready(&self) -> bool;

    fn predict(&self, question: &str, options: &[String]) -> Result<Prediction, PredictorError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(alias = "predicted_idx")]
    pub predicted_index: usize,
    pub confidence: f32,
    #[serde(default)]
    pub all_probabilities: Vec<f32>,
    #[serde(default)]
    pub inference_time: f64,
}

impl Prediction {
    /// Rejects predictions that point outside the options or carry a
    /// confidence outside [0, 1].
    pub fn validate(&self, option_count: usize) -> Result<(), PredictorError> {
        if self.predicted_index >= option_count {
            return Err(PredictorError::InvalidResponse(format!(
                "predicted index {} is out of range for {} options",
                self.predicted_index, option_count
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(PredictorError::InvalidResponse(format!(
                "confidence {} is outside [0, 1]",
                self.confidence
            )));
        }

        Ok(())
    }
}

pub struct PredictorConfig {
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    question: &'a str,
    options: &'a [String],
}

/// Prediction model served over HTTP. Expects a JSON `Prediction` in reply
/// to a POST of `{question, options}`.
pub struct RemotePredictor {
    client: Client,
    url: String,
}

impl RemotePredictor {
    pub fn new(config: PredictorConfig) -> Result<Self, PredictorError> {
        let url = config.url.ok_or(PredictorError::NotReady)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        info!("Using prediction model at {}", url);
        Ok(RemotePredictor { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Predictor for RemotePredictor {
    fn is_ready(&self) -> bool {
        true
    }

    fn predict(&self, question: &str, options: &[String]) -> Result<Prediction, PredictorError> {
        let start = Instant::now();

        let mut prediction: Prediction = self
            .client
            .post(&self.url)
            .json(&PredictRequest { question, options })
            .send()?
            .error_for_status()?
            .json()?;

        if prediction.inference_time <= 0.0 {
            prediction.inference_time = start.elapsed().as_secs_f64();
        }

        prediction.validate(options.len())?;
        Ok(prediction)
    }
}
