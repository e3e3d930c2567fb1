//! 履歴保存コーディネーター
//!
//! 解析済み（Completed）の画像を1件ずつ履歴ストアへ保存する。
//! パイプラインとは独立に動き、別々の画像なら同時に保存してよい。
//! 同じ画像の二重送信は SaveStatus で防ぐ（Saving / Saved 中は何もしない）。

use crate::error::{CropAiError, Result};
use crate::history::HistoryStore;
use crate::registry::{Item, ItemId};
use crate::scanner::SourceImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crop_ai_common::HistoryRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

/// 保存完了表示を戻すまでの既定時間
pub const DEFAULT_SAVED_RESET: Duration = Duration::from_secs(2);

/// 画像ごとの保存状態（解析ステータスとは別管理）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

/// `save` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { prediction_id: String },
    /// 保存中・保存済みのため何もしなかった
    Skipped(SaveStatus),
}

type StatusMap = Arc<Mutex<HashMap<ItemId, SaveStatus>>>;

pub struct SaveCoordinator<S> {
    store: S,
    statuses: StatusMap,
    reset_after: Duration,
}

impl<S: HistoryStore> SaveCoordinator<S> {
    pub fn new(store: S, reset_after: Duration) -> Self {
        Self {
            store,
            statuses: Arc::new(Mutex::new(HashMap::new())),
            reset_after,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn statuses(&self) -> MutexGuard<'_, HashMap<ItemId, SaveStatus>> {
        lock(&self.statuses)
    }

    /// 現在の保存状態（未保存は Idle）
    pub fn status(&self, id: ItemId) -> SaveStatus {
        self.statuses().get(&id).copied().unwrap_or_default()
    }

    /// 保存に失敗したまま再試行されていない画像の数
    pub fn failed_count(&self) -> usize {
        self.statuses()
            .values()
            .filter(|status| **status == SaveStatus::Failed)
            .count()
    }

    /// 解析結果を履歴に保存する
    ///
    /// 認証情報がなければ `NotAuthenticated`、未解析なら `ItemNotCompleted`。
    /// どちらも通信はせず、保存状態も変えない。
    pub async fn save(&self, item: &Item, credential: Option<&str>) -> Result<SaveOutcome> {
        let token = credential
            .filter(|t| !t.trim().is_empty())
            .ok_or(CropAiError::NotAuthenticated)?;
        let prediction = item
            .prediction()
            .ok_or_else(|| CropAiError::ItemNotCompleted(item.file_name().to_string()))?;

        let id = item.id();
        let in_flight = {
            let mut statuses = self.statuses();
            match statuses.get(&id).copied() {
                Some(current @ (SaveStatus::Saving | SaveStatus::Saved)) => {
                    return Ok(SaveOutcome::Skipped(current));
                }
                _ => {
                    statuses.insert(id, SaveStatus::Saving);
                    InFlight { statuses: &self.statuses, id, settled: false }
                }
            }
        };

        let record = HistoryRecord::from_prediction(
            item.file_name(),
            to_data_url(item.source()),
            prediction,
        );

        match self.store.save(&record, token).await {
            Ok(prediction_id) => {
                in_flight.settle(SaveStatus::Saved);
                info!(%id, file = item.file_name(), %prediction_id, "履歴に保存");
                self.schedule_reset(id);
                Ok(SaveOutcome::Saved { prediction_id })
            }
            Err(e) => {
                in_flight.settle(SaveStatus::Failed);
                warn!(%id, file = item.file_name(), error = %e, "履歴の保存に失敗");
                Err(CropAiError::SaveFailed(e.to_string()))
            }
        }
    }

    /// 一定時間後に Saved → Idle へ戻す（その間に状態が変わっていれば何もしない）
    ///
    /// Idle はエントリなしで表すので、戻すときはマップから取り除く。
    fn schedule_reset(&self, id: ItemId) {
        let statuses = Arc::clone(&self.statuses);
        let delay = self.reset_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut map = lock(&statuses);
            if map.get(&id) == Some(&SaveStatus::Saved) {
                map.remove(&id);
            }
        });
    }
}

/// Saving 中の印。結果を反映せずに破棄された（future が途中で捨てられた）場合は Failed に戻す
struct InFlight<'a> {
    statuses: &'a StatusMap,
    id: ItemId,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, status: SaveStatus) {
        lock(self.statuses).insert(self.id, status);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut map = lock(self.statuses);
        if map.get(&self.id) == Some(&SaveStatus::Saving) {
            map.insert(self.id, SaveStatus::Failed);
            warn!(id = %self.id, "保存が中断されました");
        }
    }
}

fn lock(statuses: &StatusMap) -> MutexGuard<'_, HashMap<ItemId, SaveStatus>> {
    statuses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 画像を `data:<mime>;base64,...` 形式に変換
pub fn to_data_url(image: &SourceImage) -> String {
    format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_data_url() {
        let image = SourceImage::from_bytes("leaf.png", b"hello".to_vec()).unwrap();
        assert_eq!(to_data_url(&image), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_save_status_default_idle() {
        assert_eq!(SaveStatus::default(), SaveStatus::Idle);
    }
}
