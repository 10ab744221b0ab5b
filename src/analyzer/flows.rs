//! 推奨アクションごとのフロー

use crate::normalizer::NormalizedImage;
use crate::vision::{FreeformCall, StructuredCall, VisionError, VisionModel};
use object_detective_common::prompts::FOLLOW_UP_TEMPERATURE;
use object_detective_common::{
    build_classification_prompt, build_guidance, build_multi_object_prompt, multi_object_fallback,
    parse_multi_object_response, parse_recognition, recognition_schema, unreachable_recognition,
    unreadable_recognition, DiagnosticResult, ImageAnalysis, MultiObjectResult, RecognitionResult,
};

/// 分類フロー: 主役の物体を1つ特定する
///
/// - 使えない応答 → 解析の先頭物体（確信度0.5）
/// - 到達不能 → Unknown（確信度0.0）
pub async fn classify(
    model: &dyn VisionModel,
    image: &NormalizedImage,
    analysis: &ImageAnalysis,
) -> RecognitionResult {
    let prompt = build_classification_prompt(analysis);
    let schema = recognition_schema();
    let call = StructuredCall {
        prompt: &prompt,
        image: Some(image.into()),
        schema: &schema,
        temperature: FOLLOW_UP_TEMPERATURE,
    };

    match model.structured(call).await {
        Ok(value) => match parse_recognition(value) {
            Ok(result) => {
                tracing::debug!(object = %result.object_name, confidence = result.confidence, "classified");
                result
            }
            Err(e) => {
                tracing::warn!("classification response did not match schema: {}", e);
                unreadable_recognition(analysis)
            }
        },
        Err(VisionError::Parse(e)) => {
            tracing::warn!("classification response unusable: {}", e);
            unreadable_recognition(analysis)
        }
        Err(VisionError::Transport(e)) => {
            tracing::error!("classification call failed: {}", e);
            unreachable_recognition()
        }
    }
}

/// 複数物体フロー: 2〜4個の物体と枠を返す
///
/// 自由形式で問い合わせ、検証に通らなければ解析の物体名から組み立てる。
pub async fn detect_objects(
    model: &dyn VisionModel,
    image: &NormalizedImage,
    analysis: &ImageAnalysis,
) -> MultiObjectResult {
    let prompt = build_multi_object_prompt(analysis);
    let call = FreeformCall {
        prompt: &prompt,
        image: Some(image.into()),
        temperature: FOLLOW_UP_TEMPERATURE,
    };

    let parsed = match model.freeform(call).await {
        Ok(text) => parse_multi_object_response(&text).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    parsed.unwrap_or_else(|e| {
        tracing::warn!("multi-object detection fell back to analysis: {}", e);
        multi_object_fallback(analysis)
    })
}

/// ガイダンスフロー（モデル呼び出しなし）
pub fn guide(analysis: &ImageAnalysis) -> DiagnosticResult {
    build_guidance(analysis)
}
