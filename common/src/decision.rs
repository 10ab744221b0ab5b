//! 判定導出
//!
//! 解析ステージの観察結果から確信度と推奨アクションを決める。
//! モデル呼び出しは行わない純粋関数。品質が物体数より優先される。

use crate::types::{
    AnalysisDecision, AnalyzedImage, ConfidenceLevel, ImageAnalysis, ImageQuality, Recommendation,
};

/// 観察結果から判定を導出
///
/// 1. POOR → GUIDE / LOW
/// 2. 物体2つ以上 → MULTI_SELECT（GOODならHIGH、それ以外MEDIUM）
/// 3. 物体1つ → CLASSIFY（GOODならHIGH、それ以外MEDIUM）
/// 4. 物体なし → GUIDE / LOW
pub fn derive_decision(analysis: &ImageAnalysis) -> AnalysisDecision {
    decide(analysis.quality, analysis.detected_objects.len())
}

/// 品質と物体数だけで決まる判定表
pub fn decide(quality: ImageQuality, object_count: usize) -> AnalysisDecision {
    let clear_level = if quality == ImageQuality::Good {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::Medium
    };

    let (confidence_level, recommendation) = match (quality, object_count) {
        (ImageQuality::Poor, _) => (ConfidenceLevel::Low, Recommendation::Guide),
        (_, n) if n >= 2 => (clear_level, Recommendation::MultiSelect),
        (_, 1) => (clear_level, Recommendation::Classify),
        _ => (ConfidenceLevel::Low, Recommendation::Guide),
    };

    AnalysisDecision {
        confidence_level,
        recommendation,
    }
}

/// 観察結果に判定を組み合わせる
pub fn analyze(analysis: ImageAnalysis) -> AnalyzedImage {
    let decision = derive_decision(&analysis);
    AnalyzedImage { analysis, decision }
}
