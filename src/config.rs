use crate::error::{CropAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const TOKEN_ENV: &str = "CROP_AI_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 分類サービスのベースURL（`/predict` を付けて呼ぶ）
    pub classifier_url: String,
    /// 履歴ストアのベースURL（`/history/...` を付けて呼ぶ）
    pub history_url: String,
    pub auth_token: Option<String>,
    /// バッチ解析の画像間ウェイト
    pub pace_ms: u64,
    /// 保存完了表示をIdleに戻すまでの時間
    pub saved_reset_ms: u64,
    /// 未設定ならトランスポート既定のまま
    pub request_timeout_seconds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classifier_url: "http://127.0.0.1:5000".into(),
            history_url: "http://127.0.0.1:5000".into(),
            auth_token: None,
            pace_ms: 500,
            saved_reset_ms: 2000,
            request_timeout_seconds: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CropAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("crop-ai").join("config.json"))
    }

    /// プレビュー用サムネイルの置き場所
    pub fn preview_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("crop-ai")
            .join("previews")
    }

    /// 認証トークン（環境変数を優先、空文字は未設定扱い）
    pub fn credential(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .or_else(|| self.auth_token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    /// 認証トークン必須の操作用（未設定なら `NotAuthenticated`）
    pub fn require_credential(&self) -> Result<String> {
        self.credential().ok_or(CropAiError::NotAuthenticated)
    }

    pub fn set_token(&mut self, token: Option<String>) -> Result<()> {
        self.auth_token = token;
        self.save()
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn saved_reset(&self) -> Duration {
        Duration::from_millis(self.saved_reset_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}
