//! 画像正規化モジュール
//!
//! モデルへ送る前に画像を検証・縮小する。
//!
//! ## 処理フロー
//! 1. サイズ（10MiB）・形式（JPEG/PNG/WEBP）・デコード可否を検証
//! 2. 1MiB以下ならそのまま返す
//! 3. 長辺1024pxを超えていれば Lanczos3 で縮小
//! 4. 透過は白背景に合成して JPEG（品質85）で再エンコード
//!
//! 再エンコードに失敗した場合は元のバイト列を返す（ベストエフォート）。

pub mod encoded;

pub use encoded::decode_base64_image;

use crate::error::{DetectiveError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;

/// 受け付ける最大サイズ
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// これ以下なら加工しない
pub const TARGET_SIZE: usize = 1024 * 1024;
/// 縮小後の長辺
pub const MAX_DIMENSION: u32 = 1024;
/// 再エンコード時の JPEG 品質
pub const JPEG_QUALITY: u8 = 85;

const ALLOWED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

pub const TOO_BIG_MESSAGE: &str = "Photo too big! Try a smaller one.";
pub const NOT_A_PHOTO_MESSAGE: &str = "This isn't a photo! Please choose a .jpg or .png file.";
pub const UNREADABLE_MESSAGE: &str = "Can't open this file! Make sure it's a photo.";

/// 正規化済み画像
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl NormalizedImage {
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            _ => "image/jpeg",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 形式とサイズを検証し、検出した形式を返す
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(DetectiveError::InvalidImage(TOO_BIG_MESSAGE.into()));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| DetectiveError::InvalidImage(UNREADABLE_MESSAGE.into()))?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(DetectiveError::InvalidImage(NOT_A_PHOTO_MESSAGE.into()));
    }

    // ヘッダーが読めるか（全体のデコードは縮小時のみ）
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|_| DetectiveError::InvalidImage(UNREADABLE_MESSAGE.into()))?;

    Ok(format)
}

/// 画像を検証し、必要なら縮小・再エンコードする
pub fn normalize(raw: &[u8]) -> Result<NormalizedImage> {
    let format = validate_image(raw)?;

    if raw.len() <= TARGET_SIZE {
        return Ok(NormalizedImage {
            bytes: raw.to_vec(),
            format,
        });
    }

    Ok(keep_smaller(raw, format, shrink(raw, format)))
}

/// 再エンコード結果が元より小さければ採用、そうでなければ元のバイト列
fn keep_smaller(raw: &[u8], format: ImageFormat, shrunk: image::ImageResult<Vec<u8>>) -> NormalizedImage {
    match shrunk {
        Ok(encoded) if encoded.len() < raw.len() => {
            tracing::debug!(before = raw.len(), after = encoded.len(), "image re-encoded");
            NormalizedImage {
                bytes: encoded,
                format: ImageFormat::Jpeg,
            }
        }
        Ok(encoded) => {
            tracing::debug!(
                before = raw.len(),
                after = encoded.len(),
                "re-encoded image is not smaller, keeping original"
            );
            NormalizedImage {
                bytes: raw.to_vec(),
                format,
            }
        }
        Err(e) => {
            tracing::warn!("could not resize image: {}", e);
            NormalizedImage {
                bytes: raw.to_vec(),
                format,
            }
        }
    }
}

/// `normalize` をブロッキング用スレッドで実行する（非同期ハンドラ用）
///
/// デコード・縮小・再エンコードは CPU を占有するため、ランタイムのワーカーでは行わない。
pub async fn normalize_blocking(raw: Vec<u8>) -> Result<NormalizedImage> {
    tokio::task::spawn_blocking(move || normalize(&raw))
        .await
        .map_err(|e| DetectiveError::Server(format!("画像処理タスクが失敗しました: {}", e)))?
}

fn shrink(raw: &[u8], format: ImageFormat) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(raw, format)?;

    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        // resize はアスペクト比を保って枠内に収める
        img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = flatten_onto_white(&img);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}

/// 透過チャンネルを白背景に合成（JPEG は透過を持てない）
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
