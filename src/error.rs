use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectiveError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("認証情報が設定されていません。GEMINI_API_KEY、または `object-detective config --set-project` と GOOGLE_CLOUD_ACCESS_TOKEN を設定してください")]
    MissingCredentials,

    /// ユーザー向けの拒否理由（そのままレスポンスに載せる）
    #[error("{0}")]
    InvalidImage(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("サーバーエラー: {0}")]
    Server(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] object_detective_common::Error),
}

impl DetectiveError {
    /// リクエスト単位の失敗としてユーザーへ返すべきエラーか
    pub fn is_user_facing(&self) -> bool {
        matches!(self, DetectiveError::InvalidImage(_))
    }
}

pub type Result<T> = std::result::Result<T, DetectiveError>;
