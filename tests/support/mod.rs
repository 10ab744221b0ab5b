//! テスト用の偽モデルと画像生成

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use object_detective::vision::{FreeformCall, StructuredCall, VisionError, VisionModel};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

/// 記録された呼び出し
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub structured: bool,
    pub prompt: String,
    pub temperature: f32,
    pub mime_type: Option<String>,
}

/// 応答を順番に返す偽モデル（台本が尽きたら Transport エラー）
#[derive(Default)]
pub struct ScriptedModel {
    structured: Mutex<VecDeque<Result<Value, VisionError>>>,
    freeform: Mutex<VecDeque<Result<String, VisionError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structured(self, response: Result<Value, VisionError>) -> Self {
        self.structured.lock().unwrap().push_back(response);
        self
    }

    pub fn with_freeform(self, response: Result<String, VisionError>) -> Self {
        self.freeform.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, structured: bool, prompt: &str, temperature: f32, mime_type: Option<&str>) {
        self.calls.lock().unwrap().push(RecordedCall {
            structured,
            prompt: prompt.to_string(),
            temperature,
            mime_type: mime_type.map(str::to_string),
        });
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn structured(&self, call: StructuredCall<'_>) -> Result<Value, VisionError> {
        self.record(true, call.prompt, call.temperature, call.image.map(|i| i.mime_type));
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VisionError::Transport("no scripted response".into())))
    }

    async fn freeform(&self, call: FreeformCall<'_>) -> Result<String, VisionError> {
        self.record(false, call.prompt, call.temperature, call.image.map(|i| i.mime_type));
        self.freeform
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VisionError::Transport("no scripted response".into())))
    }
}

/// 単色の小さな PNG
pub fn small_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([30, 160, 90])));
    encode(&img, ImageFormat::Png)
}

/// 圧縮の効かないノイズ画像（xorshift で決定的に生成）
pub fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9E37_79B9;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    let img = RgbImage::from_fn(width, height, |_, _| {
        let v = next();
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}
