//! base64 / Data URL 形式の画像入力
//!
//! カメラ撮影はブラウザから `data:image/jpeg;base64,...` で届く。

use crate::error::{DetectiveError, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use regex::Regex;

pub const UNREADABLE_BASE64_MESSAGE: &str = "Could not read the image! Try again.";

lazy_static::lazy_static! {
    // data:<mime>[;param]*;base64,
    static ref DATA_URL_RE: Regex =
        Regex::new(r"^data:(?:[\w.+-]+/[\w.+-]+)?(?:;[\w.+-]+=[\w.+-]+)*;base64,").unwrap();
}

/// base64 文字列を画像バイト列へ変換
///
/// 先頭の `data:<mime>;base64,` は取り除く。改行などの空白は無視する。
pub fn decode_base64_image(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let payload = match DATA_URL_RE.find(trimmed) {
        Some(prefix) => &trimmed[prefix.end()..],
        None => trimmed,
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DetectiveError::InvalidImage(UNREADABLE_BASE64_MESSAGE.into()));
    }

    STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(&compact))
        .map_err(|_| DetectiveError::InvalidImage(UNREADABLE_BASE64_MESSAGE.into()))
}
