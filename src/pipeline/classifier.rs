//! 画像分類サービス連携
//!
//! `/predict` に画像を multipart で送信し、上位3件の予測を受け取る。
//! HTTPエラー・不正なボディはすべて ClassificationFailed になる。

use crate::error::{CropAiError, Result};
use crate::scanner::SourceImage;
use crop_ai_common::{parse_prediction_response, PredictionResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// 画像1枚を分類するリモート処理
#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn classify(&self, image: &SourceImage) -> Result<PredictionResult>;
}

/// HTTP経由の分類サービス
pub struct HttpClassifier {
    http_client: Client,
    endpoint: String,
}

impl HttpClassifier {
    /// `base_url` は `http://host:port` 形式（`/predict` は付けない）
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http_client: builder.build()?,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    async fn post(&self, image: &SourceImage) -> std::result::Result<String, String> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type)
            .map_err(|e| e.to_string())?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        debug!(file = %image.file_name, %status, len = body.len(), "分類レスポンス受信");

        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            return Err(format!("HTTP {}: {}", status, preview));
        }
        Ok(body)
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&self, image: &SourceImage) -> Result<PredictionResult> {
        let body = self
            .post(image)
            .await
            .map_err(|e| CropAiError::ClassificationFailed(format!("{}: {}", image.file_name, e)))?;

        parse_prediction_response(&body)
            .map_err(|e| CropAiError::ClassificationFailed(format!("{}: {}", image.file_name, e)))
    }
}
