//! モデルレスポンスパーサー
//!
//! Geminiなどのレスポンスから JSON を抽出し、
//! 解析・分類・複数物体の各結果へ変換する。
//! 受理できないレスポンスはすべて `Error::Parse` になる。

use crate::error::{Error, Result};
use crate::fallback::{described_as, placeholder_box};
use crate::types::{
    BoundingBox, DetectedObject, ImageAnalysis, MultiObjectResult, RecognitionResult, MAX_OBJECTS,
    MIN_OBJECTS,
};
use serde_json::Value;

/// 複数物体レスポンスにメッセージがない場合の既定値
pub const DEFAULT_MULTI_MESSAGE: &str = "I see multiple things! Which one interests you?";

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use object_detective_common::extract_json;
///
/// let response = "Sure! {\"objects\": []}";
/// assert_eq!(extract_json(response).unwrap(), "{\"objects\": []}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSON object not found".into()))
}

/// 解析ステージの構造化出力を変換
///
/// 物体名・品質課題は前後空白を除去し、空要素は捨てる。
pub fn parse_analysis(value: Value) -> Result<ImageAnalysis> {
    let mut analysis: ImageAnalysis = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("analysis: {}", e)))?;

    analysis.detected_objects = clean_list(analysis.detected_objects);
    analysis.quality_issues = clean_list(analysis.quality_issues);
    analysis.guidance = analysis.guidance.trim().to_string();
    Ok(analysis)
}

/// 分類フローの構造化出力を変換
///
/// 物体名が空なら失敗扱い。確信度は [0, 1] に丸める。
pub fn parse_recognition(value: Value) -> Result<RecognitionResult> {
    let mut result: RecognitionResult = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("recognition: {}", e)))?;

    result.object_name = result.object_name.trim().to_string();
    if result.object_name.is_empty() {
        return Err(Error::Parse("recognition: object_name is empty".into()));
    }
    if !result.confidence.is_finite() {
        return Err(Error::Parse("recognition: confidence is not a number".into()));
    }
    result.confidence = clamp_confidence(result.confidence);
    Ok(result)
}

/// 複数物体フローの自由形式テキストを変換
///
/// 受理条件: JSONとしてパースでき、`objects` が2件以上の配列であること。
/// 要素ごとに検証し、名前のない要素は捨てる。有効要素が2件未満なら失敗、
/// 5件以上なら先頭4件に切り詰める。
pub fn parse_multi_object_response(response: &str) -> Result<MultiObjectResult> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("multi-object JSON: {}", e)))?;

    let entries = value
        .get("objects")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("multi-object: `objects` list missing".into()))?;

    if entries.len() < MIN_OBJECTS {
        return Err(Error::Parse(format!(
            "multi-object: expected at least {} objects, got {}",
            MIN_OBJECTS,
            entries.len()
        )));
    }

    let mut objects: Vec<DetectedObject> = Vec::with_capacity(MAX_OBJECTS);
    for entry in entries {
        if objects.len() == MAX_OBJECTS {
            break;
        }
        if let Some(object) = parse_detected_object(entry, objects.len()) {
            objects.push(object);
        }
    }

    if objects.len() < MIN_OBJECTS {
        return Err(Error::Parse(format!(
            "multi-object: only {} usable objects",
            objects.len()
        )));
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MULTI_MESSAGE)
        .to_string();

    Ok(MultiObjectResult { objects, message })
}

fn parse_detected_object(entry: &Value, index: usize) -> Option<DetectedObject> {
    let object_name = entry
        .get("object_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())?
        .to_string();

    let confidence = entry
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(clamp_confidence)
        .unwrap_or(0.5);

    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| described_as(&object_name));

    // 座標が壊れていれば位置に応じた仮の枠を使う
    let bounding_box = entry
        .get("box_2d")
        .cloned()
        .and_then(|b| serde_json::from_value::<BoundingBox>(b).ok())
        .unwrap_or_else(|| placeholder_box(index));

    Some(DetectedObject {
        object_name,
        confidence,
        description,
        bounding_box,
    })
}

fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
