use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::config::HostedConfig;
use crate::diagnosis::catalog::CATALOG;
use crate::error::AnalysisError;
use crate::models::{BackendKind, CanonicalResponse};
use crate::upload::ImageUpload;

/// Client for a hosted multimodal model speaking the `generateContent` API.
///
/// The model is only asked for class probabilities, so every response is
/// treated as depicting a mole.
pub struct HostedModel {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl HostedModel {
    pub fn from_config(config: &HostedConfig, timeout: Duration) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AnalysisError::Configuration(
                    "API Key not configured. Please set the API_KEY environment variable."
                        .to_string(),
                )
            })?;

        Ok(Self {
            client: super::http_client(timeout)?,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl super::Backend for HostedModel {
    fn kind(&self) -> BackendKind {
        BackendKind::Hosted
    }

    async fn analyze(&self, image: &ImageUpload) -> Result<CanonicalResponse, AnalysisError> {
        tracing::debug!(model = %self.model, file = %image.file_name, "requesting hosted classification");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(image))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "hosted model returned an error");
            return Err(classify_failure(status, &body));
        }

        let completion: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::MalformedResponse(format!("Unexpected response from AI: {e}"))
        })?;

        let text: String = completion
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "AI response contained no text.".to_string(),
            ));
        }

        parse_completion(&text, &self.model)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> AnalysisError {
    let message = super::http_error(status, body);
    if status == StatusCode::BAD_REQUEST && message.to_lowercase().contains("api key not valid") {
        return AnalysisError::Configuration(
            "Invalid API Key. Please check your API_KEY environment variable.".to_string(),
        );
    }
    AnalysisError::Backend(message)
}

/// Instruction sent alongside the image.
pub fn prompt() -> String {
    let classes: Vec<String> = CATALOG
        .iter()
        .map(|c| format!("{} ({})", c.code, c.display_name))
        .collect();
    let example: Vec<String> = CATALOG.iter().map(|c| format!("\"{}\": 0.0", c.code)).collect();

    format!(
        "Analyze this dermatoscopic image of a skin lesion. Estimate the probability of each \
         of the following diagnoses: {}. Respond with a single JSON object whose keys are \
         exactly these codes and whose values are probabilities between 0 and 1, for example \
         {{{}}}. Do not include any other text, explanation or markdown code fences.",
        classes.join(", "),
        example.join(", ")
    )
}

fn request_body(image: &ImageUpload) -> serde_json::Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": BASE64.encode(&image.bytes),
                    }
                },
                { "text": prompt() }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json"
        }
    })
}

/// Remove a surrounding triple-backtick fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").expect("fence pattern is valid")
    });

    let trimmed = text.trim();
    match fence.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse the model's text completion into a canonical response.
///
/// A JSON value that is not an object yields `scores: None`, which the
/// result processor rejects.
pub fn parse_completion(text: &str, model: &str) -> Result<CanonicalResponse, AnalysisError> {
    let payload = strip_code_fence(text);
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
        tracing::warn!(payload = %payload, "failed to parse model completion as JSON");
        AnalysisError::MalformedResponse(format!("Invalid JSON response from AI: {e}"))
    })?;

    let scores = value.as_object().map(super::normalize_scores);

    Ok(CanonicalResponse {
        is_subject: true,
        subject_confidence: None,
        scores,
        model_identifier: Some(model.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::testing::{start_stalled_server, MockServer};
    use crate::upload::PNG_HEADER;

    const MODEL: &str = "gemini-test";

    fn config(endpoint: &str, api_key: Option<&str>) -> HostedConfig {
        HostedConfig {
            api_key: api_key.map(str::to_string),
            model: MODEL.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    fn png() -> ImageUpload {
        ImageUpload::from_bytes("lesion.png".into(), PNG_HEADER.to_vec(), None).unwrap()
    }

    fn completion(text: &str) -> String {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }).to_string()
    }

    #[test]
    fn test_strip_fence_with_tag() {
        assert_eq!(strip_code_fence("```json\n{\"MEL\": 0.1}\n```"), "{\"MEL\": 0.1}");
    }

    #[test]
    fn test_strip_fence_without_tag() {
        assert_eq!(strip_code_fence("  ```\n{\"MEL\": 0.1}```  "), "{\"MEL\": 0.1}");
    }

    #[test]
    fn test_strip_fence_noop() {
        assert_eq!(strip_code_fence(" {\"MEL\": 0.1}\n"), "{\"MEL\": 0.1}");
    }

    #[test]
    fn test_fenced_parses_like_plain() {
        let plain = r#"{"MEL": 0.87, "NV": 0.05, "BCC": 0.03}"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(
            parse_completion(&fenced, MODEL).unwrap(),
            parse_completion(plain, MODEL).unwrap()
        );
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_completion("```json\nMEL: high\n```", MODEL).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn test_non_object_leaves_scores_empty() {
        let resp = parse_completion("[0.1, 0.2]", MODEL).unwrap();
        assert!(resp.scores.is_none());
        assert!(resp.is_subject);
    }

    #[test]
    fn test_prompt_lists_every_class() {
        let p = prompt();
        for class in CATALOG.iter() {
            assert!(p.contains(class.code));
            assert!(p.contains(class.display_name));
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let server = MockServer::start(200, completion("{}")).await;
        let err = HostedModel::from_config(&config(&server.url, None), Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::Configuration(_)));
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_analyze_sends_inline_image() {
        let server =
            MockServer::start(200, completion("```json\n{\"MEL\": 0.87, \"NV\": 0.05}\n```")).await;
        let model =
            HostedModel::from_config(&config(&server.url, Some("k-123")), Duration::from_secs(5))
                .unwrap();

        let resp = model.analyze(&png()).await.unwrap();
        let scores = resp.scores.unwrap();
        assert_eq!(scores["MEL"], 0.87);
        assert_eq!(scores["NV"], 0.05);
        assert_eq!(resp.model_identifier.as_deref(), Some(MODEL));

        let req = server.last_request().unwrap();
        assert_eq!(req.path, "/v1beta/models/gemini-test:generateContent");
        assert_eq!(req.header("x-goog-api-key").as_deref(), Some("k-123"));
        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        let inline = &body["contents"][0]["parts"][0]["inline_data"];
        assert_eq!(inline["mime_type"], "image/png");
        assert_eq!(inline["data"], BASE64.encode(PNG_HEADER));
        assert!(body["contents"][0]["parts"][1]["text"].as_str().unwrap().contains("MEL"));
    }

    #[tokio::test]
    async fn test_server_error_is_backend_error() {
        let server =
            MockServer::start(500, r#"{"error": {"message": "internal"}}"#.to_string()).await;
        let model =
            HostedModel::from_config(&config(&server.url, Some("k")), Duration::from_secs(5))
                .unwrap();
        let err = model.analyze(&png()).await.unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Backend("HTTP error! status: 500 - internal".to_string())
        );
    }

    #[tokio::test]
    async fn test_rejected_key_is_configuration_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}}"#;
        let server = MockServer::start(400, body.to_string()).await;
        let model =
            HostedModel::from_config(&config(&server.url, Some("bad")), Duration::from_secs(5))
                .unwrap();
        let err = model.analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let url = start_stalled_server().await;
        let model =
            HostedModel::from_config(&config(&url, Some("k")), Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        let err = model.analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_malformed() {
        let server = MockServer::start(200, r#"{"candidates": []}"#.to_string()).await;
        let model =
            HostedModel::from_config(&config(&server.url, Some("k")), Duration::from_secs(5))
                .unwrap();
        let err = model.analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }
}
