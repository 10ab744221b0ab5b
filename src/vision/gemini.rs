//! Gemini API クライアント
//!
//! - APIキーがあれば Generative Language API
//! - なければ Vertex AI（プロジェクト + アクセストークン）
//!
//! プロセス起動時に1回だけ生成し、`Arc<dyn VisionModel>` として渡す。

use super::{parse_structured_text, FreeformCall, ImagePart, StructuredCall, VisionError, VisionModel};
use crate::config::Config;
use crate::error::{DetectiveError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const GENERATIVE_LANGUAGE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// エラー本文をログに載せる最大文字数
const ERROR_BODY_PREVIEW: usize = 300;

/// Gemini APIリクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

/// Gemini APIレスポンス
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Clone)]
enum Endpoint {
    ApiKey { url: String, key: String },
    Vertex { url: String, token: String },
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    model: String,
}

impl GeminiClient {
    /// 設定から生成（APIキー優先、なければ Vertex AI）
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let endpoint = if let Some(key) = config.api_key() {
            Endpoint::ApiKey {
                url: format!("{}/{}:generateContent", GENERATIVE_LANGUAGE_URL, config.model),
                key,
            }
        } else if let (Some(project), Some(token)) = (config.project(), config.access_token()) {
            Endpoint::Vertex {
                url: vertex_url(&project, &config.location, &config.model),
                token,
            }
        } else {
            return Err(DetectiveError::MissingCredentials);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DetectiveError::Config(format!("HTTPクライアント生成に失敗: {}", e)))?;

        tracing::info!(model = %config.model, backend = endpoint.label(), "Gemini client initialized");

        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
        })
    }

    /// generateContent 呼び出し（共通処理）
    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImagePart<'_>>,
        temperature: f32,
        schema: Option<&Value>,
    ) -> std::result::Result<String, VisionError> {
        let request = build_request(prompt, image, temperature, schema);

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            image_bytes = image.map(|i| i.bytes.len()).unwrap_or(0),
            structured = schema.is_some(),
            "Gemini request"
        );

        let builder = match &self.endpoint {
            Endpoint::ApiKey { url, key } => self.http.post(url).query(&[("key", key)]),
            Endpoint::Vertex { url, token } => self.http.post(url).bearer_auth(token),
        };

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::Transport(describe_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(VisionError::Transport(format!("API error {}: {}", status, preview)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Transport(format!("invalid response envelope: {}", e)))?;

        let text = response_text(payload)?;
        tracing::debug!(response_len = text.len(), "Gemini response");
        Ok(text)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn structured(&self, call: StructuredCall<'_>) -> std::result::Result<Value, VisionError> {
        let text = self
            .generate(call.prompt, call.image, call.temperature, Some(call.schema))
            .await?;
        parse_structured_text(&text)
    }

    async fn freeform(&self, call: FreeformCall<'_>) -> std::result::Result<String, VisionError> {
        let text = self
            .generate(call.prompt, call.image, call.temperature, None)
            .await?;
        if text.trim().is_empty() {
            return Err(VisionError::Parse("empty response".into()));
        }
        Ok(text)
    }
}

impl Endpoint {
    fn label(&self) -> &'static str {
        match self {
            Endpoint::ApiKey { .. } => "generative-language",
            Endpoint::Vertex { .. } => "vertex-ai",
        }
    }
}

fn vertex_url(project: &str, location: &str, model: &str) -> String {
    format!(
        "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent"
    )
}

fn build_request<'a>(
    prompt: &'a str,
    image: Option<ImagePart<'a>>,
    temperature: f32,
    schema: Option<&'a Value>,
) -> GeminiRequest<'a> {
    let mut parts = vec![Part::Text { text: prompt }];
    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type,
                data: STANDARD.encode(image.bytes),
            },
        });
    }

    GeminiRequest {
        contents: vec![Content { role: "user", parts }],
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: "application/json",
            response_schema: schema,
        },
    }
}

/// 先頭候補のテキストパートを連結
fn response_text(payload: GeminiResponse) -> std::result::Result<String, VisionError> {
    if let Some(reason) = payload.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(VisionError::Parse(format!("prompt blocked: {}", reason)));
    }

    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| VisionError::Parse("no candidates".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
        return Err(VisionError::Parse(format!("no text in response (finish reason {})", reason)));
    }

    Ok(text)
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
