//! ビジョンモデル連携
//!
//! モデルは「画像 + プロンプト (+ スキーマ) → 構造化値 / テキスト」を返す
//! 不透明な能力として扱う。呼び出しは2種類:
//! - StructuredCall: スキーマで出力を拘束し、JSON値を返す
//! - FreeformCall: スキーマなし、生テキストを返す（呼び出し側でパース）
//!
//! どちらも失敗は `VisionError` で返し、呼び出し側がフォールバックする。

mod gemini;

pub use gemini::GeminiClient;

use crate::normalizer::NormalizedImage;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// リクエストに添付する画像
#[derive(Debug, Clone, Copy)]
pub struct ImagePart<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

impl<'a> From<&'a NormalizedImage> for ImagePart<'a> {
    fn from(image: &'a NormalizedImage) -> Self {
        Self {
            bytes: &image.bytes,
            mime_type: image.mime_type(),
        }
    }
}

/// スキーマ拘束つき呼び出し
#[derive(Debug, Clone, Copy)]
pub struct StructuredCall<'a> {
    pub prompt: &'a str,
    pub image: Option<ImagePart<'a>>,
    pub schema: &'a Value,
    pub temperature: f32,
}

/// 自由形式呼び出し
#[derive(Debug, Clone, Copy)]
pub struct FreeformCall<'a> {
    pub prompt: &'a str,
    pub image: Option<ImagePart<'a>>,
    pub temperature: f32,
}

/// モデル呼び出しの失敗
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    /// 到達不能・クォータ超過・HTTPエラー・タイムアウト
    #[error("model transport failure: {0}")]
    Transport(String),

    /// 応答はあったが使える形ではない
    #[error("model response unusable: {0}")]
    Parse(String),
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn structured(&self, call: StructuredCall<'_>) -> Result<Value, VisionError>;

    async fn freeform(&self, call: FreeformCall<'_>) -> Result<String, VisionError>;
}

/// 構造化テキストをJSON値に変換（前後の説明文やコードブロックは許容）
pub(crate) fn parse_structured_text(text: &str) -> Result<Value, VisionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(VisionError::Parse("empty response".into()));
    }

    serde_json::from_str(trimmed).or_else(|_| {
        let json = object_detective_common::extract_json(trimmed)
            .map_err(|e| VisionError::Parse(e.to_string()))?;
        serde_json::from_str(json).map_err(|e| VisionError::Parse(e.to_string()))
    })
}
