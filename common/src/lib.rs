//! Object Detective Common Library
//!
//! CLIとHTTPサーバーで共有される型と判定ロジック（I/Oなし）

pub mod types;
pub mod error;
pub mod decision;
pub mod fallback;
pub mod guidance;
pub mod parser;
pub mod prompts;
pub mod schema;

pub use types::{
    AnalysisDecision, AnalyzedImage, ApiResponse, BoundingBox, ConfidenceLevel, DetectedObject,
    DiagnosticResult, ImageAnalysis, ImageQuality, MultiObjectResult, Recommendation,
    RecognitionOutcome, RecognitionResult,
};
pub use error::{Error, Result};
pub use decision::{analyze, decide, derive_decision};
pub use fallback::{
    multi_object_fallback, unreachable_analysis, unreachable_recognition, unreadable_analysis,
    unreadable_recognition,
};
pub use guidance::build_guidance;
pub use parser::{extract_json, parse_analysis, parse_multi_object_response, parse_recognition};
pub use prompts::{build_analysis_prompt, build_classification_prompt, build_multi_object_prompt};
pub use schema::{analysis_schema, recognition_schema};
