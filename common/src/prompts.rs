//! プロンプト生成モジュール
//!
//! - build_analysis_prompt: 解析ステージ（観察のみ）
//! - build_classification_prompt: 分類フロー（解析の文脈つき）
//! - build_multi_object_prompt: 複数物体フロー（枠つき、自由形式JSON）

use crate::types::ImageAnalysis;

/// 解析ステージの温度
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// 分類・複数物体フローの温度
pub const FOLLOW_UP_TEMPERATURE: f32 = 0.1;

/// 解析ステージ用プロンプト
///
/// 判断（次に何をするか）は求めず、見えるものだけを記述させる。
pub fn build_analysis_prompt() -> String {
    r#"You are an intelligent Image Diagnostic Assistant. Your goal is to analyze the *quality*, *composition*, and *clarity* of the photo and describe exactly what you see.

When analyzing an image, follow this "Stream of Thought" format:

1. **Visual Audit (Thinking Aloud):** Start with phrases like "Hmm, I see...", "Looking closely...", or "I notice...". Describe the raw visual data. Is it dark? Blurry? Are there obstructions? What objects are visible? How many distinct objects do you see?
2. **Hypothesis Generation:** Try to guess what the subject(s) are. Use phrases like "I am suggesting maybe...", "This looks like it could be...", or "It seems the user is trying to capture..."
3. **Identify Distortions/Issues:** Explicitly name any problems (e.g., blur, dark, bright, cropped, obstruction, too_close, too_far, multiple_unclear).
4. **Quality Assessment:** Rate the overall image quality based on focus, lighting, framing, and clarity.

**Tone:** Helpful, slightly inquisitive, and deductive.

Provide your response in JSON format:

{
  "comprehensive_explanation": "Hmm, I see... Looking closely at this image, I notice... This looks like it could be... The image quality appears to be...",
  "image_quality": "GOOD|MODERATE|POOR",
  "quality_issues": ["issue1", "issue2"],
  "detected_objects": ["Apple", "Coffee Mug"],
  "guidance": "One short, child-friendly tip for taking a better photo"
}

Notes:
- quality_issues should be an empty array [] if there are no issues; list the most important issue first
- detected_objects must be concrete object names a child would recognize (e.g. "Banana", "Teddy Bear"); never vague placeholders like "red thing", "round object" or "something"
- detected_objects should be an empty array [] if nothing can be identified
- guidance must address the first quality issue in simple words a child understands; use an empty string if there are no issues
- Focus on OBSERVATION, not decisions about what to do next
"#
    .to_string()
}

/// 分類フロー用プロンプト
///
/// 解析の説明文と検出物体名を文脈として渡し、1回目と矛盾しない答えに寄せる。
pub fn build_classification_prompt(analysis: &ImageAnalysis) -> String {
    let context = format!(
        "Based on my initial analysis: {}\n\nThe main object appears to be: {}.",
        analysis.comprehensive_explanation,
        object_hint(analysis)
    );

    format!(
        r#"You are helping a child identify an object in a photo.

Context from initial analysis:
{context}

Now provide a final, confident identification with a fun, child-friendly description.

Rules:
- Focus on the MAIN object
- Give ONE clear answer
- Provide a confidence score from 0.0 to 1.0
- Use simple, child-friendly language (avoid technical terms)
- Make the description fun and educational!

Output JSON format:
{{
  "object_name": "friendly name of the object",
  "confidence": 0.95,
  "description": "A fun, simple sentence describing the object for a child"
}}

Examples of good descriptions:
- "A yummy yellow fruit that monkeys love!"
- "A round toy that you can bounce and play with!"
- "A fluffy friend that says meow!"
"#
    )
}

/// 複数物体フロー用プロンプト
pub fn build_multi_object_prompt(analysis: &ImageAnalysis) -> String {
    let context = format!(
        "Based on my initial analysis: {}\n\nI detected {} objects: {}.",
        analysis.comprehensive_explanation,
        analysis.detected_objects.len(),
        object_hint(analysis)
    );

    format!(
        r#"You are helping a child identify objects in a photo. There are multiple things visible.

Context from initial analysis:
{context}

Now provide details for each object including bounding boxes so we can show the child where each one is.

Rules:
- List 2-4 distinct objects that a child would point to
- Use simple, child-friendly names and descriptions
- Provide bounding boxes in [ymin, xmin, ymax, xmax] format, normalized to 0-1000 scale
- Make descriptions fun and educational!

Output JSON format:
{{
  "objects": [
    {{
      "object_name": "Apple",
      "confidence": 0.9,
      "description": "A yummy red fruit that keeps the doctor away!",
      "box_2d": [ymin, xmin, ymax, xmax]
    }}
  ],
  "message": "I see a few things here! Which one do you want to know about?"
}}

IMPORTANT about box_2d:
- Format is [ymin, xmin, ymax, xmax] where each value is an integer 0-1000
- 0 = top/left edge, 1000 = bottom/right edge
- The box should tightly surround each object
"#
    )
}

fn object_hint(analysis: &ImageAnalysis) -> String {
    if analysis.detected_objects.is_empty() {
        "unknown".to_string()
    } else {
        analysis.detected_objects.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageQuality;

    fn sample() -> ImageAnalysis {
        ImageAnalysis {
            comprehensive_explanation: "Hmm, I see a shiny red apple on a table.".to_string(),
            quality: ImageQuality::Good,
            quality_issues: Vec::new(),
            detected_objects: vec!["Apple".to_string(), "Cup".to_string()],
            guidance: String::new(),
        }
    }

    #[test]
    fn test_analysis_prompt_is_observation_only() {
        let prompt = build_analysis_prompt();
        assert!(prompt.contains("detected_objects"));
        assert!(prompt.contains("guidance"));
        assert!(prompt.contains("GOOD|MODERATE|POOR"));
        assert!(!prompt.contains("MULTI_SELECT"));
    }

    #[test]
    fn test_classification_prompt_includes_context() {
        let prompt = build_classification_prompt(&sample());
        assert!(prompt.contains("shiny red apple"));
        assert!(prompt.contains("The main object appears to be: Apple, Cup."));
        assert!(prompt.contains("\"object_name\""));
    }

    #[test]
    fn test_multi_object_prompt_includes_count() {
        let prompt = build_multi_object_prompt(&sample());
        assert!(prompt.contains("I detected 2 objects: Apple, Cup."));
        assert!(prompt.contains("box_2d"));
        assert!(prompt.contains("0-1000"));
    }

    #[test]
    fn test_object_hint_unknown_when_empty() {
        let mut analysis = sample();
        analysis.detected_objects.clear();
        let prompt = build_classification_prompt(&analysis);
        assert!(prompt.contains("appears to be: unknown."));
    }
}
