//! 選択画像レジストリ
//!
//! 選択モード・画像一覧・各画像のステータスを保持する。
//! プレビューリソースの所有者はこのレジストリのみで、
//! 削除・クリア・選択のやり直しのいずれでも必ず解放される。

mod item;
pub mod preview;

pub use item::{Item, ItemId, ItemStatus};
pub use preview::{NoPreview, PreviewHandle, PreviewStore, ThumbnailDir};

use crate::error::{CropAiError, Result};
use crate::scanner::SourceImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// バッチモードの最大枚数
pub const BATCH_LIMIT: usize = 10;

/// 選択モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Single,
    Batch,
}

impl SelectionMode {
    /// 一度に選択できる最大枚数
    pub fn limit(&self) -> usize {
        match self {
            SelectionMode::Single => 1,
            SelectionMode::Batch => BATCH_LIMIT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Single => "single",
            SelectionMode::Batch => "batch",
        }
    }
}

pub struct ItemRegistry {
    mode: SelectionMode,
    items: Vec<Item>,
    previews: Arc<dyn PreviewStore>,
}

impl ItemRegistry {
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            mode: SelectionMode::default(),
            items: Vec::new(),
            previews,
        }
    }

    /// 画像を選択し、現在の選択を置き換える
    ///
    /// 枚数がモードの上限を超える場合は何も変更せずに失敗する。
    /// プレビュー確保に失敗した場合も、確保済みの分を解放して元の選択を残す。
    pub fn select(&mut self, files: Vec<SourceImage>, mode: SelectionMode) -> Result<&[Item]> {
        if files.len() > mode.limit() {
            return Err(CropAiError::SelectionLimitExceeded {
                mode: mode.as_str(),
                limit: mode.limit(),
                requested: files.len(),
            });
        }

        let mut fresh = Vec::with_capacity(files.len());
        for source in files {
            let id = ItemId::allocate();
            let preview = PreviewHandle::acquire(&self.previews, id, &source)?;
            fresh.push(Item::new(id, source, preview));
        }

        // 旧アイテムはここで破棄され、プレビューも解放される
        self.items = fresh;
        self.mode = mode;
        info!(mode = mode.as_str(), count = self.items.len(), "画像を選択");
        Ok(self.items.as_slice())
    }

    /// 1枚削除（存在しなければ何もしない）
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.items.iter().position(|item| item.id() == id) {
            Some(index) => {
                let item = self.items.remove(index);
                debug!(id = %item.id(), file = item.file_name(), "画像を削除");
                true
            }
            None => false,
        }
    }

    /// 全削除（新しいバッチの開始）
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            debug!(count = self.items.len(), "選択をクリア");
        }
        self.items.clear();
    }

    /// モード切替（切り替わった場合は選択をクリア）
    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode != mode {
            self.clear();
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub(crate) fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// すべて Pending（まだ解析に使われていない）か
    pub fn is_fresh(&self) -> bool {
        self.items.iter().all(|item| item.status() == ItemStatus::Pending)
    }
}
