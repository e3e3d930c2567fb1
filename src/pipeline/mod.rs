//! バッチ解析パイプライン
//!
//! 選択順に1枚ずつ分類サービスを呼び、各画像を終端状態まで進める。
//! 1枚の失敗はその画像だけを Error にして次へ進む（バッチ全体は止めない）。
//!
//! 進捗は `BatchRun::next` で1イベントずつ取り出す遅延列になっている。
//! 同時に投げるリクエストは常に1件。

mod classifier;
mod pacer;

pub use classifier::{Classifier, HttpClassifier};
pub use pacer::{Pacer, DEFAULT_PACE};

use crate::error::{CropAiError, Result};
use crate::registry::{ItemId, ItemRegistry, ItemStatus};
use crate::stats::BatchStats;
use tracing::{error, info, warn};

/// 失敗した画像に付ける詳細
pub const FAILURE_DETAIL: &str = "analysis failed";

/// 進捗イベント
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 画像を Processing にした（リクエストは次の `next` で送る）
    Processing {
        index: usize,
        id: ItemId,
        file_name: String,
        percent: f32,
    },
    /// 画像が終端状態になった
    ItemDone {
        index: usize,
        id: ItemId,
        file_name: String,
        status: ItemStatus,
        percent: f32,
    },
    /// 全画像の処理が終わった
    Finished { percent: f32 },
}

impl ProgressEvent {
    pub fn percent(&self) -> f32 {
        match self {
            ProgressEvent::Processing { percent, .. }
            | ProgressEvent::ItemDone { percent, .. }
            | ProgressEvent::Finished { percent } => *percent,
        }
    }
}

pub struct BatchPipeline<C> {
    classifier: C,
    pacer: Pacer,
}

impl<C: Classifier> BatchPipeline<C> {
    pub fn new(classifier: C, pacer: Pacer) -> Self {
        Self { classifier, pacer }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// 解析を開始する
    ///
    /// 画像がない場合、または Pending 以外の画像を含む場合（解析済みのセット）は失敗する。
    pub fn start<'a>(&'a self, registry: &'a mut ItemRegistry) -> Result<BatchRun<'a, C>> {
        if registry.is_empty() {
            return Err(CropAiError::EmptySelection);
        }
        if !registry.is_fresh() {
            return Err(CropAiError::BatchNotFresh);
        }

        let total = registry.len();
        info!(total, mode = registry.mode().as_str(), "バッチ解析開始");
        Ok(BatchRun {
            pipeline: self,
            registry,
            total,
            phase: Phase::Dispatch(0),
            pace_due: false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// index番目を Processing にする（index == total なら完了）
    Dispatch(usize),
    /// index番目のリクエストを送って結果を反映する
    Await(usize),
    Done,
}

/// 1回分の解析実行（再開・再実行不可）
///
/// 途中で破棄すると、Processing のまま残った画像は Error にする。
/// それ以降の画像は Pending のまま残るが、セットは解析済み扱いになる。
pub struct BatchRun<'a, C> {
    pipeline: &'a BatchPipeline<C>,
    registry: &'a mut ItemRegistry,
    total: usize,
    phase: Phase,
    pace_due: bool,
}

impl<'a, C: Classifier> BatchRun<'a, C> {
    fn percent_at(&self, index: usize) -> f32 {
        index as f32 / self.total as f32 * 100.0
    }

    /// 次の進捗イベントを取り出す。完了後は常に None
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        match self.phase {
            Phase::Done => None,
            Phase::Dispatch(index) => {
                if self.pace_due {
                    self.pipeline.pacer.pause().await;
                    self.pace_due = false;
                }

                if index >= self.total {
                    self.phase = Phase::Done;
                    info!(total = self.total, "バッチ解析完了");
                    return Some(ProgressEvent::Finished { percent: 100.0 });
                }

                let percent = self.percent_at(index);
                let item = &mut self.registry.items_mut()[index];
                if let Err(e) = item.mark_processing() {
                    error!(error = %e, "Processingへの遷移に失敗");
                }
                self.phase = Phase::Await(index);
                Some(ProgressEvent::Processing {
                    index,
                    id: item.id(),
                    file_name: item.file_name().to_string(),
                    percent,
                })
            }
            Phase::Await(index) => {
                let percent = self.percent_at(index + 1);
                let item = &mut self.registry.items_mut()[index];

                let outcome = match self.pipeline.classifier.classify(item.source()).await {
                    Ok(prediction) => item.complete(prediction),
                    Err(e) => {
                        warn!(file = item.file_name(), error = %e, "解析失敗");
                        item.fail(FAILURE_DETAIL)
                    }
                };
                if let Err(e) = outcome {
                    error!(error = %e, "終端状態への遷移に失敗");
                }

                self.pace_due = true;
                self.phase = Phase::Dispatch(index + 1);
                Some(ProgressEvent::ItemDone {
                    index,
                    id: item.id(),
                    file_name: item.file_name().to_string(),
                    status: item.status(),
                    percent,
                })
            }
        }
    }

    /// 最後まで実行し、各イベントを `on_event` に渡す
    pub async fn run_to_end(mut self, mut on_event: impl FnMut(&ProgressEvent)) -> BatchStats {
        while let Some(event) = self.next().await {
            on_event(&event);
        }
        BatchStats::from_items(self.registry.items())
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }
}

impl<C> Drop for BatchRun<'_, C> {
    fn drop(&mut self) {
        if let Phase::Await(index) = self.phase {
            let item = &mut self.registry.items_mut()[index];
            warn!(file = item.file_name(), "解析が中断されました");
            if let Err(e) = item.fail(FAILURE_DETAIL) {
                error!(error = %e, "終端状態への遷移に失敗");
            }
        }
    }
}
