//! Object Detective
//!
//! 子供が撮った写真を解析し、物体名・複数物体の選択肢・撮り直しのヒントの
//! いずれかを返す認識パイプライン。

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod scanner;
pub mod server;
pub mod vision;
