use super::preview::PreviewHandle;
use crate::error::{CropAiError, Result};
use crate::scanner::SourceImage;
use crop_ai_common::PredictionResult;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 画像の識別子（プロセス内で単調増加、再利用しない）
///
/// レジストリをまたいでも重複しないので、保存状態やプレビューの置き場所のキーにそのまま使える。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub(crate) u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ItemId {
    /// 新しいIDを割り当てる
    pub fn allocate() -> Self {
        ItemId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// 画像ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }
}

/// 状態ごとに持つデータ（予測結果は Completed、詳細は Error のみ）
#[derive(Debug)]
enum ItemState {
    Pending,
    Processing,
    Completed(PredictionResult),
    Error(String),
}

/// 管理対象の画像1枚
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    source: SourceImage,
    preview: PreviewHandle,
    state: ItemState,
}

impl Item {
    pub(crate) fn new(id: ItemId, source: SourceImage, preview: PreviewHandle) -> Self {
        Self {
            id,
            source,
            preview,
            state: ItemState::Pending,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.source.file_name
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn status(&self) -> ItemStatus {
        match self.state {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::Processing => ItemStatus::Processing,
            ItemState::Completed(_) => ItemStatus::Completed,
            ItemState::Error(_) => ItemStatus::Error,
        }
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match &self.state {
            ItemState::Completed(p) => Some(p),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            ItemState::Error(detail) => Some(detail),
            _ => None,
        }
    }

    // 許される遷移: Pending → Processing → {Completed | Error}

    pub(crate) fn mark_processing(&mut self) -> Result<()> {
        self.transition(ItemStatus::Pending, ItemState::Processing)
    }

    pub(crate) fn complete(&mut self, prediction: PredictionResult) -> Result<()> {
        self.transition(ItemStatus::Processing, ItemState::Completed(prediction))
    }

    pub(crate) fn fail(&mut self, detail: impl Into<String>) -> Result<()> {
        self.transition(ItemStatus::Processing, ItemState::Error(detail.into()))
    }

    fn transition(&mut self, expected: ItemStatus, next: ItemState) -> Result<()> {
        let current = self.status();
        if current != expected {
            return Err(CropAiError::InvalidTransition {
                id: self.id.to_string(),
                from: current.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }
}
