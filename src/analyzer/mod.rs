//! 認識パイプライン
//!
//! 1. 解析（画像 → 品質・物体一覧・ガイダンス）
//! 2. 判定（品質 × 物体数 → 推奨アクション）
//! 3. 振り分け（分類 / 複数物体 / ガイダンス）
//!
//! モデル側の失敗はすべて各段のフォールバックで吸収し、
//! `recognize` は必ず結果を返す。

mod flows;

use crate::error::Result;
use crate::normalizer::{self, NormalizedImage};
use crate::vision::{StructuredCall, VisionError, VisionModel};
use object_detective_common::prompts::ANALYSIS_TEMPERATURE;
use object_detective_common::{
    analysis_schema, analyze, build_analysis_prompt, parse_analysis, unreachable_analysis,
    unreadable_analysis, AnalyzedImage, ApiResponse, RecognitionOutcome, Recommendation,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// 認識パイプライン本体
///
/// モデルクライアントはプロセスで1つを共有する。
pub struct Recognizer {
    model: Arc<dyn VisionModel>,
    analysis_prompt: String,
    analysis_schema: Value,
}

impl Recognizer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            analysis_prompt: build_analysis_prompt(),
            analysis_schema: analysis_schema(),
        }
    }

    /// 生バイト列を正規化してから認識する
    ///
    /// エラーになるのは画像自体を受け付けられない場合のみ。
    pub async fn recognize_bytes(&self, raw: &[u8]) -> Result<RecognitionOutcome> {
        let image = normalizer::normalize_blocking(raw.to_vec()).await?;
        Ok(self.recognize(&image).await)
    }

    /// 1ファイルを認識してエンベロープにする
    ///
    /// 読み込み失敗や画像の拒否は失敗エンベロープとして返す（フォルダ一括処理で他のファイルを止めない）。
    pub async fn recognize_file(&self, path: &Path, base64: bool) -> ApiResponse {
        let result = match read_image_file(path, base64) {
            Ok(raw) => self.recognize_bytes(&raw).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => ApiResponse::from(outcome),
            Err(e) => {
                tracing::warn!(path = %path.display(), "recognition failed: {}", e);
                ApiResponse::failure(e.to_string())
            }
        }
    }

    /// 解析 → 判定 → 振り分け
    pub async fn recognize(&self, image: &NormalizedImage) -> RecognitionOutcome {
        let span = tracing::info_span!("recognize", image = %fingerprint(&image.bytes));

        async {
            let analyzed = self.analyze_image(image).await;
            tracing::info!(
                quality = analyzed.analysis.quality.as_str(),
                objects = analyzed.analysis.detected_objects.len(),
                recommendation = analyzed.decision.recommendation.as_str(),
                "analysis complete"
            );

            let outcome = self.dispatch(image, &analyzed).await;
            tracing::info!(outcome = outcome.kind(), "recognition complete");
            outcome
        }
        .instrument(span)
        .await
    }

    /// 解析段: 1回の構造化呼び出しで画像を解析し、判定を付ける
    pub async fn analyze_image(&self, image: &NormalizedImage) -> AnalyzedImage {
        let call = StructuredCall {
            prompt: &self.analysis_prompt,
            image: Some(image.into()),
            schema: &self.analysis_schema,
            temperature: ANALYSIS_TEMPERATURE,
        };

        let analysis = match self.model.structured(call).await {
            Ok(value) => parse_analysis(value).unwrap_or_else(|e| {
                tracing::warn!("analysis response did not match schema: {}", e);
                unreadable_analysis()
            }),
            Err(VisionError::Parse(e)) => {
                tracing::warn!("analysis response unusable: {}", e);
                unreadable_analysis()
            }
            Err(VisionError::Transport(e)) => {
                tracing::error!("analysis call failed: {}", e);
                unreachable_analysis()
            }
        };

        analyze(analysis)
    }

    /// 推奨アクションごとのフローへ振り分け
    pub async fn dispatch(&self, image: &NormalizedImage, analyzed: &AnalyzedImage) -> RecognitionOutcome {
        match analyzed.decision.recommendation {
            Recommendation::Classify => {
                RecognitionOutcome::Recognized(flows::classify(self.model.as_ref(), image, &analyzed.analysis).await)
            }
            Recommendation::MultiSelect => {
                RecognitionOutcome::MultiObject(flows::detect_objects(self.model.as_ref(), image, &analyzed.analysis).await)
            }
            Recommendation::Guide => RecognitionOutcome::Guidance(flows::guide(&analyzed.analysis)),
        }
    }
}

fn read_image_file(path: &Path, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        let text = std::fs::read_to_string(path)?;
        normalizer::decode_base64_image(&text)
    } else {
        Ok(std::fs::read(path)?)
    }
}

/// ログ用の短い画像識別子（SHA-256 先頭12桁）
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..6])
}
