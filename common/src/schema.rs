//! 構造化出力のレスポンススキーマ
//!
//! Gemini の `responseSchema`（OpenAPI サブセット）形式。
//! 複数物体フローはスキーマを使わない（枠の配列が崩れやすいため）。

use serde_json::{json, Value};

/// 解析ステージのスキーマ
///
/// 確信度・推奨アクションは含めない（ローカルで導出する）。
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "comprehensive_explanation": { "type": "STRING" },
            "image_quality": {
                "type": "STRING",
                "enum": ["GOOD", "MODERATE", "POOR"]
            },
            "quality_issues": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "detected_objects": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "guidance": { "type": "STRING" }
        },
        "required": [
            "comprehensive_explanation",
            "image_quality",
            "quality_issues",
            "detected_objects",
            "guidance"
        ]
    })
}

/// 分類フローのスキーマ
pub fn recognition_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "object_name": { "type": "STRING" },
            "confidence": { "type": "NUMBER", "minimum": 0.0, "maximum": 1.0 },
            "description": { "type": "STRING" }
        },
        "required": ["object_name", "confidence", "description"]
    })
}
