//! 認識パイプラインの型定義
//!
//! CLIとHTTPサーバーで共有される型:
//! - ImageAnalysis: 解析ステージ（観察のみ）の出力
//! - AnalysisDecision: 解析結果から導出した判定
//! - RecognitionResult / MultiObjectResult / DiagnosticResult: 最終出力
//! - ApiResponse: JSONレスポンスの共通エンベロープ

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 座標系の上限（0〜1000に正規化）
pub const BOX_SCALE: u32 = 1000;

/// 複数物体結果の最小件数
pub const MIN_OBJECTS: usize = 2;

/// 複数物体結果の最大件数
pub const MAX_OBJECTS: usize = 4;

// =============================================
// 列挙型
// =============================================

/// 画像品質
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ImageQuality {
    Good,
    Moderate,
    Poor,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Good => "GOOD",
            ImageQuality::Moderate => "MODERATE",
            ImageQuality::Poor => "POOR",
        }
    }
}

impl FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Ok(ImageQuality::Good),
            "MODERATE" => Ok(ImageQuality::Moderate),
            "POOR" => Ok(ImageQuality::Poor),
            other => Err(format!("unknown image quality: {}", other)),
        }
    }
}

impl TryFrom<String> for ImageQuality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判定の確信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// 次に実行するフロー
///
/// 未知のラベルは `Classify` として扱う（ディスパッチの既定分岐）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum Recommendation {
    Classify,
    MultiSelect,
    Guide,
}

impl Recommendation {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "GUIDE" => Recommendation::Guide,
            "MULTI_SELECT" => Recommendation::MultiSelect,
            _ => Recommendation::Classify,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Classify => "CLASSIFY",
            Recommendation::MultiSelect => "MULTI_SELECT",
            Recommendation::Guide => "GUIDE",
        }
    }
}

impl From<String> for Recommendation {
    fn from(value: String) -> Self {
        Recommendation::from_label(&value)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================
// 解析ステージ
// =============================================

/// 解析ステージの出力: 画像から観察した内容
///
/// 確信度と推奨アクションはここに含めない（モデルの自己申告は使わない）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub comprehensive_explanation: String,

    #[serde(rename = "image_quality")]
    pub quality: ImageQuality,

    #[serde(default)]
    pub quality_issues: Vec<String>,

    #[serde(default)]
    pub detected_objects: Vec<String>,

    #[serde(default)]
    pub guidance: String,
}

/// 解析結果から導出した判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDecision {
    pub confidence_level: ConfidenceLevel,
    pub recommendation: Recommendation,
}

/// 観察結果と判定の組（生成後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedImage {
    pub analysis: ImageAnalysis,
    pub decision: AnalysisDecision,
}

// =============================================
// 最終出力
// =============================================

/// 単一物体の認識結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub object_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
}

/// バウンディングボックス [ymin, xmin, ymax, xmax]（0〜1000）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u32; 4]", try_from = "Vec<f64>")]
pub struct BoundingBox {
    pub ymin: u32,
    pub xmin: u32,
    pub ymax: u32,
    pub xmax: u32,
}

impl BoundingBox {
    /// 範囲外の値を丸め、min/maxが逆転していれば入れ替える
    pub fn new(ymin: i64, xmin: i64, ymax: i64, xmax: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, BOX_SCALE as i64) as u32;
        let (ymin, ymax) = (clamp(ymin), clamp(ymax));
        let (xmin, xmax) = (clamp(xmin), clamp(xmax));
        Self {
            ymin: ymin.min(ymax),
            xmin: xmin.min(xmax),
            ymax: ymin.max(ymax),
            xmax: xmin.max(xmax),
        }
    }

    /// 重なりがあるか（辺の接触は重なりとしない）
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.ymin < other.ymax
            && other.ymin < self.ymax
            && self.xmin < other.xmax
            && other.xmin < self.xmax
    }

    pub fn to_array(&self) -> [u32; 4] {
        [self.ymin, self.xmin, self.ymax, self.xmax]
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl TryFrom<Vec<f64>> for BoundingBox {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [ymin, xmin, ymax, xmax] if values.iter().all(|v| v.is_finite()) => Ok(Self::new(
                ymin.round() as i64,
                xmin.round() as i64,
                ymax.round() as i64,
                xmax.round() as i64,
            )),
            _ => Err(format!("box_2d must be 4 numbers, got {:?}", values)),
        }
    }
}

/// 複数物体結果の1要素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub object_name: String,
    pub confidence: f64,
    pub description: String,
    #[serde(rename = "box_2d")]
    pub bounding_box: BoundingBox,
}

/// 複数物体結果（objectsは常に2〜4件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiObjectResult {
    pub objects: Vec<DetectedObject>,
    pub message: String,
}

/// 撮り直しガイダンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub comprehensive_explanation: String,
    pub issue: String,
    pub friendly_message: String,
    pub guesses: Vec<String>,
    pub confidence_of_guesses: Vec<f64>,
}

/// パイプラインの最終結果
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Recognized(RecognitionResult),
    MultiObject(MultiObjectResult),
    Guidance(DiagnosticResult),
}

impl RecognitionOutcome {
    /// ログ用の種別名
    pub fn kind(&self) -> &'static str {
        match self {
            RecognitionOutcome::Recognized(_) => "recognized",
            RecognitionOutcome::MultiObject(_) => "multi_object",
            RecognitionOutcome::Guidance(_) => "guidance",
        }
    }
}

/// APIレスポンスの共通エンベロープ
///
/// 成功時は result / multi_object / diagnostic のいずれか1つだけが入る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub result: Option<RecognitionResult>,
    pub multi_object: Option<MultiObjectResult>,
    pub diagnostic: Option<DiagnosticResult>,
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            multi_object: None,
            diagnostic: None,
            error: Some(message.into()),
        }
    }
}

impl From<RecognitionOutcome> for ApiResponse {
    fn from(outcome: RecognitionOutcome) -> Self {
        let mut response = Self {
            success: true,
            result: None,
            multi_object: None,
            diagnostic: None,
            error: None,
        };
        match outcome {
            RecognitionOutcome::Recognized(r) => response.result = Some(r),
            RecognitionOutcome::MultiObject(m) => response.multi_object = Some(m),
            RecognitionOutcome::Guidance(d) => response.diagnostic = Some(d),
        }
        response
    }
}
