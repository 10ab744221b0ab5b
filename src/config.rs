use crate::error::{DetectiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Vertex AI のプロジェクト（環境変数が優先）
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
/// Vertex AI のアクセストークン（環境変数が優先）
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_CLOUD_ACCESS_TOKEN";
/// Generative Language API のキー（環境変数が優先）
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: Option<String>,
    pub location: String,
    #[serde(alias = "model_name")]
    pub model: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: None,
            location: "us-central1".into(),
            model: "gemini-2.0-flash".into(),
            api_key: None,
            access_token: None,
            timeout_seconds: 60,
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

impl Config {
    /// 指定パスから読み込み（なければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DetectiveError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("object-detective").join("config.json"))
    }

    pub fn project(&self) -> Option<String> {
        env_or(PROJECT_ENV, &self.project)
    }

    pub fn api_key(&self) -> Option<String> {
        env_or(API_KEY_ENV, &self.api_key)
    }

    pub fn access_token(&self) -> Option<String> {
        env_or(ACCESS_TOKEN_ENV, &self.access_token)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DetectiveError::Config("model が空です".into()));
        }
        if self.location.trim().is_empty() {
            return Err(DetectiveError::Config("location が空です".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(DetectiveError::Config("timeout_seconds は1以上にしてください".into()));
        }
        Ok(())
    }
}

// 環境変数を優先
fn env_or(name: &str, fallback: &Option<String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.clone().filter(|v| !v.trim().is_empty()))
}
