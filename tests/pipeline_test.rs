//! 認識パイプラインのテスト
//!
//! 偽モデルで解析 → 判定 → 各フローの流れとフォールバックを検証

mod support;

use object_detective::analyzer::Recognizer;
use object_detective::error::DetectiveError;
use object_detective::vision::VisionError;
use object_detective_common::{
    ConfidenceLevel, ImageQuality, RecognitionOutcome, Recommendation,
};
use serde_json::json;
use std::sync::Arc;
use support::{small_png, ScriptedModel};

fn analysis(quality: &str, issues: &[&str], objects: &[&str], guidance: &str) -> serde_json::Value {
    json!({
        "comprehensive_explanation": "A photo taken by a child.",
        "image_quality": quality,
        "quality_issues": issues,
        "detected_objects": objects,
        "guidance": guidance,
    })
}

fn recognizer(model: ScriptedModel) -> (Recognizer, Arc<ScriptedModel>) {
    let model = Arc::new(model);
    (Recognizer::new(model.clone()), model)
}

// =============================================
// 解析段
// =============================================

#[tokio::test]
async fn test_analysis_stage_derives_decision() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new().with_structured(Ok(analysis("GOOD", &[], &["Apple"], ""))),
    );
    let image = object_detective::normalizer::normalize(&small_png()).unwrap();

    let analyzed = recognizer.analyze_image(&image).await;
    assert_eq!(analyzed.analysis.quality, ImageQuality::Good);
    assert_eq!(analyzed.decision.confidence_level, ConfidenceLevel::High);
    assert_eq!(analyzed.decision.recommendation, Recommendation::Classify);
}

#[tokio::test]
async fn test_analysis_transport_failure_becomes_guidance() {
    let (recognizer, model) = recognizer(
        ScriptedModel::new().with_structured(Err(VisionError::Transport("quota exceeded".into()))),
    );

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    match outcome {
        RecognitionOutcome::Guidance(d) => {
            assert_eq!(d.issue, "ERROR");
            assert!(!d.friendly_message.is_empty());
            assert!(d.guesses.is_empty());
        }
        other => panic!("expected guidance, got {:?}", other),
    }
    assert_eq!(model.calls().len(), 1);
}

#[tokio::test]
async fn test_analysis_parse_failure_becomes_guidance() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new().with_structured(Ok(json!({"unexpected": true}))),
    );

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    match outcome {
        RecognitionOutcome::Guidance(d) => assert_eq!(d.issue, "ANALYSIS_FAILED"),
        other => panic!("expected guidance, got {:?}", other),
    }
}

// =============================================
// ガイダンスフロー
// =============================================

#[tokio::test]
async fn test_poor_dark_photo_gets_guidance_verbatim() {
    let (recognizer, model) = recognizer(ScriptedModel::new().with_structured(Ok(analysis(
        "POOR",
        &["dark"],
        &[],
        "It's too dark! Try turning on a light.",
    ))));

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    match outcome {
        RecognitionOutcome::Guidance(d) => {
            assert_eq!(d.issue, "DARK");
            assert_eq!(d.friendly_message, "It's too dark! Try turning on a light.");
            assert!(d.guesses.is_empty());
        }
        other => panic!("expected guidance, got {:?}", other),
    }

    // ガイダンスはモデルを追加で呼ばない
    assert_eq!(model.calls().len(), 1);
}

#[tokio::test]
async fn test_poor_with_many_objects_still_guides() {
    let (recognizer, _) = recognizer(ScriptedModel::new().with_structured(Ok(analysis(
        "POOR",
        &["blurry"],
        &["Ball", "Dog", "Tree", "Car"],
        "Hold still!",
    ))));

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    match outcome {
        RecognitionOutcome::Guidance(d) => {
            assert_eq!(d.issue, "BLURRY");
            assert_eq!(d.guesses, vec!["Ball", "Dog", "Tree"]);
            assert_eq!(d.confidence_of_guesses.len(), 3);
        }
        other => panic!("expected guidance, got {:?}", other),
    }
}

// =============================================
// 分類フロー
// =============================================

#[tokio::test]
async fn test_good_single_object_is_classified() {
    let (recognizer, model) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("GOOD", &[], &["Apple"], "")))
            .with_structured(Ok(json!({
                "object_name": "Red Apple",
                "confidence": 0.93,
                "description": "A shiny red apple!"
            }))),
    );

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    match outcome {
        RecognitionOutcome::Recognized(r) => {
            assert_eq!(r.object_name, "Red Apple");
            assert!((r.confidence - 0.93).abs() < 1e-9);
        }
        other => panic!("expected recognition, got {:?}", other),
    }

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.structured));
    assert!((calls[0].temperature - 0.3).abs() < 1e-6);
    assert!((calls[1].temperature - 0.1).abs() < 1e-6);
    assert!(calls[1].prompt.contains("Apple"));
    assert_eq!(calls[1].mime_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_classification_confidence_is_clamped() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("GOOD", &[], &["Cat"], "")))
            .with_structured(Ok(json!({
                "object_name": "Cat",
                "confidence": 1.7,
                "description": "A fluffy cat!"
            }))),
    );

    match recognizer.recognize_bytes(&small_png()).await.unwrap() {
        RecognitionOutcome::Recognized(r) => assert_eq!(r.confidence, 1.0),
        other => panic!("expected recognition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_classification_unreadable_uses_first_detected_object() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("GOOD", &[], &["Apple"], "")))
            .with_structured(Err(VisionError::Parse("not json".into()))),
    );

    match recognizer.recognize_bytes(&small_png()).await.unwrap() {
        RecognitionOutcome::Recognized(r) => {
            assert_eq!(r.object_name, "Apple");
            assert_eq!(r.confidence, 0.5);
        }
        other => panic!("expected recognition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_classification_unreachable_gives_unknown() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("GOOD", &[], &["Apple"], "")))
            .with_structured(Err(VisionError::Transport("timeout".into()))),
    );

    match recognizer.recognize_bytes(&small_png()).await.unwrap() {
        RecognitionOutcome::Recognized(r) => {
            assert_eq!(r.object_name, "Unknown");
            assert_eq!(r.confidence, 0.0);
        }
        other => panic!("expected recognition, got {:?}", other),
    }
}

// =============================================
// 複数物体フロー
// =============================================

#[tokio::test]
async fn test_moderate_two_objects_falls_back_on_model_failure() {
    let (recognizer, model) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("MODERATE", &[], &["Apple", "Cup"], "")))
            .with_freeform(Err(VisionError::Transport("unavailable".into()))),
    );

    let outcome = recognizer.recognize_bytes(&small_png()).await.unwrap();
    let multi = match outcome {
        RecognitionOutcome::MultiObject(m) => m,
        other => panic!("expected multi-object, got {:?}", other),
    };

    let names: Vec<&str> = multi.objects.iter().map(|o| o.object_name.as_str()).collect();
    assert_eq!(names, vec!["Apple", "Cup"]);
    assert!((multi.objects[0].confidence - 0.7).abs() < 1e-9);
    assert!((multi.objects[1].confidence - 0.6).abs() < 1e-9);
    assert!(!multi.objects[0].bounding_box.overlaps(&multi.objects[1].bounding_box));

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls[1].structured);
    assert!(calls[1].prompt.contains("Apple"));
}

#[tokio::test]
async fn test_multi_object_response_is_validated_and_truncated() {
    let response = r#"Here is what I found:
```json
{
  "objects": [
    {"object_name": "Ball", "confidence": 0.9, "description": "A red ball!", "box_2d": [10, 10, 200, 200]},
    {"object_name": "", "confidence": 0.8},
    {"object_name": "Dog", "confidence": 1.4, "box_2d": [300, 300, 600, 600]},
    {"object_name": "Tree", "box_2d": "bad"},
    {"object_name": "Car", "confidence": 0.4, "box_2d": [700, 700, 900, 900]},
    {"object_name": "Kite", "confidence": 0.3, "box_2d": [0, 0, 50, 50]}
  ],
  "message": "Which one do you like?"
}
```"#;

    let (recognizer, _) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("GOOD", &[], &["Ball", "Dog", "Tree"], "")))
            .with_freeform(Ok(response.to_string())),
    );

    let multi = match recognizer.recognize_bytes(&small_png()).await.unwrap() {
        RecognitionOutcome::MultiObject(m) => m,
        other => panic!("expected multi-object, got {:?}", other),
    };

    let names: Vec<&str> = multi.objects.iter().map(|o| o.object_name.as_str()).collect();
    assert_eq!(names, vec!["Ball", "Dog", "Tree", "Car"]);
    assert_eq!(multi.objects[1].confidence, 1.0);
    assert_eq!(multi.objects[2].confidence, 0.5);
    assert_eq!(multi.objects[2].description, "This looks like a Tree!");
    assert_eq!(multi.message, "Which one do you like?");
}

#[tokio::test]
async fn test_multi_object_with_too_few_results_falls_back() {
    let (recognizer, _) = recognizer(
        ScriptedModel::new()
            .with_structured(Ok(analysis("MODERATE", &[], &["Apple", "Cup", "Spoon"], "")))
            .with_freeform(Ok(r#"{"objects": [{"object_name": "Apple"}]}"#.to_string())),
    );

    match recognizer.recognize_bytes(&small_png()).await.unwrap() {
        RecognitionOutcome::MultiObject(m) => {
            assert_eq!(m.objects.len(), 3);
            assert_eq!(m.objects[2].object_name, "Spoon");
            assert!((m.objects[2].confidence - 0.5).abs() < 1e-9);
        }
        other => panic!("expected multi-object, got {:?}", other),
    }
}

// =============================================
// 入力の拒否
// =============================================

#[tokio::test]
async fn test_invalid_image_is_rejected_before_model() {
    let (recognizer, model) = recognizer(ScriptedModel::new());

    let err = recognizer.recognize_bytes(b"hello, not a photo").await.unwrap_err();
    assert!(matches!(err, DetectiveError::InvalidImage(_)));
    assert!(err.is_user_facing());
    assert!(model.calls().is_empty());
}

// =============================================
// ファイル単位の認識
// =============================================

#[tokio::test]
async fn test_unreadable_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("b.png");
    std::fs::write(&good, small_png()).unwrap();
    let missing = dir.path().join("a.png");

    let (recognizer, _) = recognizer(ScriptedModel::new().with_structured(Ok(analysis(
        "POOR",
        &["dark"],
        &[],
        "Turn on a light!",
    ))));

    let first = recognizer.recognize_file(&missing, false).await;
    assert!(!first.success);
    assert!(first.error.is_some());

    let second = recognizer.recognize_file(&good, false).await;
    assert!(second.success);
    assert_eq!(second.diagnostic.unwrap().issue, "DARK");
}

#[tokio::test]
async fn test_recognize_file_reads_base64_text() {
    use base64::Engine;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.txt");
    let encoded = base64::engine::general_purpose::STANDARD.encode(small_png());
    std::fs::write(&path, format!("data:image/png;base64,{}\n", encoded)).unwrap();

    let (recognizer, model) = recognizer(
        ScriptedModel::new().with_structured(Ok(analysis("POOR", &["blurry"], &[], "Hold still!"))),
    );

    let response = recognizer.recognize_file(&path, true).await;
    assert!(response.success);
    assert_eq!(model.calls()[0].mime_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_recognize_file_rejection_is_a_failure_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.jpg");
    std::fs::write(&path, b"shopping list").unwrap();

    let (recognizer, model) = recognizer(ScriptedModel::new());
    let response = recognizer.recognize_file(&path, false).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(object_detective::normalizer::UNREADABLE_MESSAGE));
    assert!(model.calls().is_empty());
}
