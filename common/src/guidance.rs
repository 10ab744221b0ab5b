//! 撮り直しガイダンス
//!
//! 解析結果だけから DiagnosticResult を組み立てる（モデル呼び出しなし）。

use crate::types::{DiagnosticResult, ImageAnalysis};

/// 課題タグがないときの既定値
pub const UNCLEAR_ISSUE: &str = "UNCLEAR";

/// 推測として返す最大件数
const MAX_GUESSES: usize = 3;

/// 推測の確信度（先頭から順に）
const GUESS_CONFIDENCES: [f64; MAX_GUESSES] = [0.4, 0.3, 0.2];

/// 課題タグ → 子供向けメッセージ（ガイダンス文が空のときだけ使う）
const ISSUE_MESSAGES: &[(&str, &str)] = &[
    ("blur", "The photo is a bit blurry! Try holding the camera very still."),
    ("dark", "It's too dark to see! Try moving to a brighter spot."),
    ("bright", "It's too bright! Try moving away from the light."),
    ("cropped", "Part of the object is cut off! Try stepping back a little."),
    ("obstruction", "Something is blocking the view! Try moving it out of the way."),
    ("too_close", "You're too close! Try stepping back so I can see the whole thing."),
    ("too_far", "You're too far away! Try getting closer so I can see better."),
    (
        "multiple_unclear",
        "I see a few things but I'm not sure which one you want! Try pointing at just one thing.",
    ),
];

const DEFAULT_MESSAGE: &str = "Hmm, I'm having trouble seeing clearly! Try taking another photo.";

/// 解析結果からガイダンスを生成
///
/// - friendly_message: 解析のガイダンス文をそのまま使う
/// - issue: 先頭の品質課題を大文字化（なければ UNCLEAR）
/// - guesses: 検出物体の先頭3件（空でもよい）
pub fn build_guidance(analysis: &ImageAnalysis) -> DiagnosticResult {
    // 正規化して空になる課題（"-" など）は飛ばす
    let issue = analysis
        .quality_issues
        .iter()
        .map(|s| normalize_issue(s))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| UNCLEAR_ISSUE.to_string());

    let friendly_message = if analysis.guidance.trim().is_empty() {
        canned_message(&issue).to_string()
    } else {
        analysis.guidance.clone()
    };

    let guesses: Vec<String> = analysis
        .detected_objects
        .iter()
        .take(MAX_GUESSES)
        .cloned()
        .collect();
    let confidence_of_guesses = GUESS_CONFIDENCES[..guesses.len()].to_vec();

    DiagnosticResult {
        comprehensive_explanation: analysis.comprehensive_explanation.clone(),
        issue,
        friendly_message,
        guesses,
        confidence_of_guesses,
    }
}

/// "too close" / "too-close" → "TOO_CLOSE"
pub fn normalize_issue(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn canned_message(issue: &str) -> &'static str {
    let key = issue.to_lowercase();
    ISSUE_MESSAGES
        .iter()
        .find(|(tag, _)| *tag == key)
        .map(|(_, message)| *message)
        .unwrap_or(DEFAULT_MESSAGE)
}
