//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` endpoint with:
//! - Plain text completions
//! - Structured JSON output constrained by a response schema
//! - Image generation returning inline base64 payloads

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a Gemini client from `GEMINI_API_KEY`, falling back to `API_KEY`.
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = first_key([
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("API_KEY").ok(),
        ])
        .ok_or(Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a `generateContent` request and return the parsed response.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parse_response(api_response))
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let parts = request
        .parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => ApiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::InlineData(blob) => ApiPart {
                text: None,
                inline_data: Some(ApiBlob {
                    mime_type: blob.mime_type.clone(),
                    data: blob.data.clone(),
                }),
            },
        })
        .collect();

    let config = ApiGenerationConfig {
        temperature: request.temperature,
        response_mime_type: request.response_mime_type.clone(),
        response_schema: request.response_schema.clone(),
        response_modalities: request.response_modalities.clone(),
        image_config: request
            .image_aspect_ratio
            .as_ref()
            .map(|ratio| ApiImageConfig {
                aspect_ratio: ratio.clone(),
            }),
    };

    ApiRequest {
        contents: vec![ApiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: if config.is_empty() { None } else { Some(config) },
    }
}

fn parse_response(api_response: ApiResponse) -> Response {
    let candidates = api_response
        .candidates
        .into_iter()
        .map(|c| Candidate {
            parts: c
                .content
                .map(|content| content.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| match (p.text, p.inline_data) {
                    (_, Some(blob)) => Some(Part::InlineData(Blob {
                        mime_type: blob.mime_type,
                        data: blob.data,
                    })),
                    (Some(text), None) => Some(Part::Text(text)),
                    (None, None) => None,
                })
                .collect(),
            finish_reason: c.finish_reason,
        })
        .collect();

    Response {
        candidates,
        usage: api_response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A `generateContent` request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: Option<String>,
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<serde_json::Value>,
    pub response_modalities: Option<Vec<String>>,
    pub image_aspect_ratio: Option<String>,
}

impl Request {
    /// Create a single-turn request from user text.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask for `application/json` output matching `schema`.
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_schema = Some(schema);
        self
    }

    pub fn with_response_modalities(mut self, modalities: &[&str]) -> Self {
        self.response_modalities = Some(modalities.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.image_aspect_ratio = Some(ratio.into());
        self
    }
}

/// One piece of request or response content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

/// Base64-encoded binary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    /// Render as a `data:` URI.
    pub fn as_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A single generated candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub parts: Vec<Part>,
    pub finish_reason: Option<String>,
}

/// A `generateContent` response.
#[derive(Debug, Clone)]
pub struct Response {
    pub candidates: Vec<Candidate>,
    pub usage: Option<Usage>,
}

impl Response {
    /// Text of the first candidate, concatenated.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text(t) => Some(t.as_str()),
                        Part::InlineData(_) => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// First inline payload of the first candidate.
    pub fn inline_data(&self) -> Option<&Blob> {
        self.candidates.first()?.parts.iter().find_map(|p| match p {
            Part::InlineData(blob) => Some(blob),
            Part::Text(_) => None,
        })
    }
}

/// Token usage information.
#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ApiBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ApiImageConfig>,
}

impl ApiGenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.response_mime_type.is_none()
            && self.response_schema.is_none()
            && self.response_modalities.is_none()
            && self.image_config.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

/// The first candidate key that is not blank, trimmed.
pub fn first_key(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_key_falls_through() {
        let key = first_key([Some(String::new()), Some("real-key".to_string())]);
        assert_eq!(key.as_deref(), Some("real-key"));
        assert_eq!(first_key([Some("  ".to_string()), None]), None);
        assert_eq!(first_key([None, Some(" k \n".to_string())]).as_deref(), Some("k"));
    }

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key").with_model("gemini-2.5-flash-image");
        assert_eq!(client.model(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_plain_request_omits_generation_config() {
        let request = Request::text("Hello");
        let body = serde_json::to_value(build_api_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_json_schema_request() {
        let schema = json!({"type": "OBJECT", "properties": {}});
        let request = Request::text("Design a creature")
            .with_temperature(1.2)
            .with_json_schema(schema.clone());
        let body = serde_json::to_value(build_api_request(&request)).unwrap();

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"], schema);
        assert!((config["temperature"].as_f64().unwrap() - 1.2).abs() < 1e-6);
        assert!(config.get("imageConfig").is_none());
    }

    #[test]
    fn test_image_request() {
        let request = Request::text("Draw it")
            .with_response_modalities(&["IMAGE"])
            .with_aspect_ratio("1:1");
        let body = serde_json::to_value(build_api_request(&request)).unwrap();

        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn test_parse_text_response() {
        let raw: ApiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"name\":"}, {"text": "\"X\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 30}
        }))
        .unwrap();

        let response = parse_response(raw);
        assert_eq!(response.text(), "{\"name\":\"X\"}");
        assert!(response.inline_data().is_none());
        assert_eq!(response.usage.unwrap().output_tokens, 30);
    }

    #[test]
    fn test_parse_image_response() {
        let raw: ApiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your creature"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0"}}
                ]}
            }]
        }))
        .unwrap();

        let response = parse_response(raw);
        let blob = response.inline_data().expect("image part");
        assert_eq!(blob.as_data_uri(), "data:image/png;base64,iVBORw0");
    }

    #[test]
    fn test_parse_empty_response() {
        let raw: ApiResponse = serde_json::from_value(json!({})).unwrap();
        let response = parse_response(raw);
        assert_eq!(response.text(), "");
        assert!(response.inline_data().is_none());
    }
}
