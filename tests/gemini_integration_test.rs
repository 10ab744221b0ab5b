//! 実際の Gemini API を使う結合テスト（GEMINI_API_KEY がなければスキップ）

mod support;

use object_detective::analyzer::Recognizer;
use object_detective::config::Config;
use object_detective::vision::GeminiClient;
use object_detective_common::types::BOX_SCALE;
use object_detective_common::{ApiResponse, BoundingBox};
use std::sync::Arc;

fn live_config() -> Option<Config> {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Some(Config::default()),
        _ => {
            eprintln!("GEMINI_API_KEY not set; skipping integration test");
            None
        }
    }
}

#[tokio::test]
async fn gemini_recognize_integration() {
    let Some(config) = live_config() else {
        return;
    };

    let client = GeminiClient::from_config(&config).expect("client init failed");
    let recognizer = Recognizer::new(Arc::new(client));

    let outcome = recognizer
        .recognize_bytes(&support::small_png())
        .await
        .expect("image rejected");
    let response = ApiResponse::from(outcome);

    assert!(response.success);
    let filled = [
        response.result.is_some(),
        response.multi_object.is_some(),
        response.diagnostic.is_some(),
    ];
    assert_eq!(filled.iter().filter(|f| **f).count(), 1);

    if let Some(result) = &response.result {
        assert!((0.0..=1.0).contains(&result.confidence));
    }
    if let Some(multi) = &response.multi_object {
        assert!((2..=4).contains(&multi.objects.len()));
        for object in &multi.objects {
            let BoundingBox { ymax, xmax, .. } = object.bounding_box;
            assert!(ymax <= BOX_SCALE && xmax <= BOX_SCALE);
        }
    }
    if let Some(diagnostic) = &response.diagnostic {
        assert!(!diagnostic.issue.is_empty());
    }
}
