//! フォールバック結果の生成
//!
//! モデル出力が使えないときに、ローカルで決定的に組み立てる代替結果。

use crate::types::{
    BoundingBox, DetectedObject, ImageAnalysis, ImageQuality, MultiObjectResult, RecognitionResult,
    MAX_OBJECTS, MIN_OBJECTS,
};

/// 仮の枠の開始位置
const PLACEHOLDER_ORIGIN: i64 = 100;
/// 仮の枠の間隔（対角方向）
const PLACEHOLDER_STRIDE: i64 = 200;
/// 仮の枠の一辺（間隔より小さく、隣同士は重ならない）
const PLACEHOLDER_EXTENT: i64 = 180;

/// 汎用ガイダンス（解析失敗時）
pub const GENERIC_GUIDANCE: &str = "Hmm, I'm having trouble seeing clearly! Try taking another photo.";

/// 複数物体フォールバックのメッセージ
pub const FALLBACK_MULTI_MESSAGE: &str = "I see a few things! Which one do you want to know about?";

/// 物体名が足りないときの穴埋め
const PADDING_NAMES: &[&str] = &["something", "another thing"];

/// 解析レスポンスを構造化できなかった場合の劣化解析
pub fn unreadable_analysis() -> ImageAnalysis {
    degraded_analysis(
        "Hmm, I'm having trouble analyzing this image clearly.",
        "analysis_failed",
    )
}

/// モデルに到達できなかった場合の劣化解析
pub fn unreachable_analysis() -> ImageAnalysis {
    degraded_analysis("Something went wrong while analyzing this image.", "error")
}

fn degraded_analysis(explanation: &str, issue: &str) -> ImageAnalysis {
    ImageAnalysis {
        comprehensive_explanation: explanation.to_string(),
        quality: ImageQuality::Poor,
        quality_issues: vec![issue.to_string()],
        detected_objects: Vec::new(),
        guidance: GENERIC_GUIDANCE.to_string(),
    }
}

/// 分類レスポンスが使えない場合: 解析で見つけた先頭の物体を使う
pub fn unreadable_recognition(analysis: &ImageAnalysis) -> RecognitionResult {
    RecognitionResult {
        object_name: analysis
            .detected_objects
            .first()
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        confidence: 0.5,
        description: "I found something interesting!".to_string(),
    }
}

/// 分類時にモデルへ到達できなかった場合（ユーザーに見える唯一の「お手上げ」）
pub fn unreachable_recognition() -> RecognitionResult {
    RecognitionResult {
        object_name: "Unknown".to_string(),
        confidence: 0.0,
        description: "Something went wrong! Let's try again.".to_string(),
    }
}

/// index番目の仮の枠 `[100+200i, 100+200i, 280+200i, 280+200i]`
pub fn placeholder_box(index: usize) -> BoundingBox {
    let start = PLACEHOLDER_ORIGIN + PLACEHOLDER_STRIDE * index as i64;
    let end = start + PLACEHOLDER_EXTENT;
    BoundingBox::new(start, start, end, end)
}

/// テンプレート説明文
pub fn described_as(name: &str) -> String {
    format!("This looks like a {}!", name)
}

/// 解析の物体名から複数物体結果を組み立てる
///
/// 先頭4件まで、確信度は0.7から0.1ずつ下げる。
/// 名前が2件に満たない場合は汎用名で埋め、2〜4件を保証する。
pub fn multi_object_fallback(analysis: &ImageAnalysis) -> MultiObjectResult {
    let mut names: Vec<&str> = analysis
        .detected_objects
        .iter()
        .take(MAX_OBJECTS)
        .map(String::as_str)
        .collect();

    for padding in PADDING_NAMES {
        if names.len() >= MIN_OBJECTS {
            break;
        }
        names.push(*padding);
    }

    let objects = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| DetectedObject {
            object_name: name.to_string(),
            confidence: fallback_confidence(i),
            description: described_as(name),
            bounding_box: placeholder_box(i),
        })
        .collect();

    MultiObjectResult {
        objects,
        message: FALLBACK_MULTI_MESSAGE.to_string(),
    }
}

fn fallback_confidence(index: usize) -> f64 {
    // 0.7, 0.6, 0.5, 0.4（浮動小数の誤差を避けて10分率で計算）
    (7 - index as i64).max(0) as f64 / 10.0
}
