use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::config::LocalConfig;
use crate::error::AnalysisError;
use crate::models::{BackendKind, CanonicalResponse};
use crate::upload::ImageUpload;

const DEFAULT_DETECTOR_MODEL: &str = "mole_detector";

/// Client for the self-hosted two-stage classifier (mole detection, then
/// lesion classification).
pub struct LocalClassifier {
    client: Client,
    url: String,
}

/// Success body of the classifier's predict endpoint.
#[derive(Debug, Deserialize)]
struct PredictBody {
    is_mole: Option<bool>,
    predictions: Option<serde_json::Value>,
    mole_detection_probability: Option<f64>,
    model_version: Option<String>,
    model_used: Option<String>,
}

impl LocalClassifier {
    pub fn from_config(config: &LocalConfig, timeout: Duration) -> Result<Self, AnalysisError> {
        let url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                AnalysisError::Configuration(
                    "API URL not configured. Please set the API_URL environment variable."
                        .to_string(),
                )
            })?;

        Ok(Self {
            client: super::http_client(timeout)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl super::Backend for LocalClassifier {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn analyze(&self, image: &ImageUpload) -> Result<CanonicalResponse, AnalysisError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type)?;
        let form = Form::new().part("image_file", part);

        tracing::debug!(url = %self.url, file = %image.file_name, "posting image to local classifier");

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "local classifier returned an error");
            return Err(AnalysisError::Backend(super::http_error(status, &body)));
        }

        parse_predict_body(&body)
    }
}

/// Interpret a success body from the classifier.
///
/// `is_mole: false` is a valid outcome with no scores; `is_mole: true`
/// requires a `predictions` object. Anything else is malformed.
pub fn parse_predict_body(body: &str) -> Result<CanonicalResponse, AnalysisError> {
    let data: PredictBody = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(body = %body, "local classifier body is not the expected JSON");
        AnalysisError::MalformedResponse(format!("Unexpected response structure from local API: {e}"))
    })?;

    match (data.is_mole, data.predictions) {
        (Some(true), Some(serde_json::Value::Object(predictions))) => Ok(CanonicalResponse {
            is_subject: true,
            subject_confidence: data.mole_detection_probability,
            scores: Some(super::normalize_scores(&predictions)),
            model_identifier: data.model_version,
        }),
        (Some(false), _) => {
            tracing::info!(
                confidence = ?data.mole_detection_probability,
                "classifier reports the image is not a mole"
            );
            Ok(CanonicalResponse {
                is_subject: false,
                subject_confidence: data.mole_detection_probability,
                scores: Some(Default::default()),
                model_identifier: Some(
                    data.model_used
                        .unwrap_or_else(|| DEFAULT_DETECTOR_MODEL.to_string()),
                ),
            })
        }
        _ => Err(AnalysisError::MalformedResponse(
            "Unexpected response structure from local API.".to_string(),
        )),
    }
}
