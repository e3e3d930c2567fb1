//! プレビューリソース管理
//!
//! 画像ごとに表示用プレビューを確保し、`PreviewHandle` の破棄時に
//! ちょうど1回だけ解放する。所有者は ItemRegistry のみ。

use super::ItemId;
use crate::error::{CropAiError, Result};
use crate::scanner::SourceImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// サムネイルの最大辺
const THUMBNAIL_SIZE: u32 = 256;

/// プレビューの確保・解放を行うバックエンド
pub trait PreviewStore: Send + Sync {
    /// プレビューを確保し、その場所を返す
    fn acquire(&self, id: ItemId, image: &SourceImage) -> Result<String>;

    /// `acquire` が返した場所を解放する
    fn release(&self, location: &str);
}

/// 確保済みプレビュー（スコープを抜けると解放）
pub struct PreviewHandle {
    store: Arc<dyn PreviewStore>,
    location: String,
}

impl PreviewHandle {
    pub(crate) fn acquire(
        store: &Arc<dyn PreviewStore>,
        id: ItemId,
        image: &SourceImage,
    ) -> Result<Self> {
        let location = store.acquire(id, image)?;
        Ok(Self {
            store: Arc::clone(store),
            location,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(&self.location);
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("location", &self.location)
            .finish()
    }
}

/// プレビューを作らない（ヘッドレス実行用）
#[derive(Debug, Default)]
pub struct NoPreview;

impl PreviewStore for NoPreview {
    fn acquire(&self, id: ItemId, _image: &SourceImage) -> Result<String> {
        Ok(id.to_string())
    }

    fn release(&self, _location: &str) {}
}

/// サムネイルをフォルダに書き出すプレビュー
///
/// デコードできない画像は元データをそのまま書き出す。
#[derive(Debug)]
pub struct ThumbnailDir {
    dir: PathBuf,
}

impl ThumbnailDir {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PreviewStore for ThumbnailDir {
    fn acquire(&self, id: ItemId, image: &SourceImage) -> Result<String> {
        let path = match image::load_from_memory(&image.bytes) {
            Ok(decoded) => {
                let path = self.dir.join(format!("{}.png", id));
                decoded
                    .thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
                    .save(&path)
                    .map_err(|e| CropAiError::PreviewFailed(format!("{}: {}", image.file_name, e)))?;
                path
            }
            Err(e) => {
                debug!(file = %image.file_name, error = %e, "デコード不可、元データでプレビュー作成");
                let path = self.dir.join(format!("{}-{}", id, image.file_name));
                std::fs::write(&path, &image.bytes)?;
                path
            }
        };
        Ok(path.display().to_string())
    }

    fn release(&self, location: &str) {
        if let Err(e) = std::fs::remove_file(location) {
            warn!(location, error = %e, "プレビュー削除に失敗");
        }
    }
}

impl Drop for ThumbnailDir {
    fn drop(&mut self) {
        // 空のときだけ消える
        let _ = std::fs::remove_dir(&self.dir);
    }
}
