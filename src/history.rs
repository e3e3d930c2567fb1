//! 履歴ストア連携
//!
//! Bearerトークン付きで `/history/save|history|stats|delete/{id}` を呼ぶ。
//! 2xx以外の応答はボディの `error` をそのままエラーメッセージにする。

use crate::error::{CropAiError, Result};
use crop_ai_common::{HistoryEntry, HistoryRecord, HistoryStats, StoreReply};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// 履歴の保存・参照・削除
#[allow(async_fn_in_trait)]
pub trait HistoryStore {
    /// 保存してストアが割り当てたIDを返す
    async fn save(&self, record: &HistoryRecord, token: &str) -> Result<String>;

    /// 新しい順の一覧
    async fn list(&self, token: &str) -> Result<Vec<HistoryEntry>>;

    async fn stats(&self, token: &str) -> Result<HistoryStats>;

    async fn delete(&self, prediction_id: &str, token: &str) -> Result<()>;
}

pub struct HttpHistoryStore {
    http_client: Client,
    base_url: String,
}

impl HttpHistoryStore {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http_client: builder.build()?,
            base_url: format!("{}/history", base_url.trim_end_matches('/')),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<StoreReply> {
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, len = body.len(), "履歴ストア応答");

        let reply: Option<StoreReply> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = reply
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(CropAiError::History(message));
        }

        let reply = reply.ok_or_else(|| {
            CropAiError::History(format!("応答がJSONではありません (HTTP {})", status))
        })?;
        if let Some(error) = reply.error {
            return Err(CropAiError::History(error));
        }
        Ok(reply)
    }
}

impl HistoryStore for HttpHistoryStore {
    async fn save(&self, record: &HistoryRecord, token: &str) -> Result<String> {
        let request = self.http_client.post(self.url("save")).json(record);
        let reply = self.send(request, token).await?;
        Ok(reply.prediction_id.unwrap_or_default())
    }

    async fn list(&self, token: &str) -> Result<Vec<HistoryEntry>> {
        let request = self.http_client.get(self.url("history"));
        Ok(self.send(request, token).await?.history)
    }

    async fn stats(&self, token: &str) -> Result<HistoryStats> {
        let request = self.http_client.get(self.url("stats"));
        self.send(request, token)
            .await?
            .stats
            .ok_or_else(|| CropAiError::History("statsがありません".into()))
    }

    async fn delete(&self, prediction_id: &str, token: &str) -> Result<()> {
        let request = self
            .http_client
            .delete(self.url(&format!("delete/{}", prediction_id)));
        self.send(request, token).await?;
        Ok(())
    }
}
