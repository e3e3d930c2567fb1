//! バッチ結果の集計
//!
//! 画像一覧から 健康 / 病害 / 失敗 の件数を導出する。保持はせず、毎回計算する。

use crate::registry::{Item, ItemStatus, SelectionMode};
use crop_ai_common::is_healthy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub healthy_count: usize,
    pub diseased_count: usize,
    pub failed_count: usize,
}

impl BatchStats {
    pub fn from_items(items: &[Item]) -> Self {
        let mut stats = BatchStats {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            match (item.status(), item.prediction()) {
                (ItemStatus::Completed, Some(prediction)) => {
                    if is_healthy(&prediction.top1.class_name) {
                        stats.healthy_count += 1;
                    } else {
                        stats.diseased_count += 1;
                    }
                }
                (ItemStatus::Error, _) => stats.failed_count += 1,
                _ => {}
            }
        }

        stats
    }

    pub fn completed_count(&self) -> usize {
        self.healthy_count + self.diseased_count
    }

    /// バッチモードかつ2枚以上のときだけ表示する
    pub fn is_reportable(mode: SelectionMode, item_count: usize) -> bool {
        mode == SelectionMode::Batch && item_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ItemRegistry, NoPreview};
    use crate::scanner::SourceImage;
    use crop_ai_common::{PredictionResult, TopPrediction};
    use std::sync::Arc;

    fn prediction(class_name: &str) -> PredictionResult {
        PredictionResult {
            top1: TopPrediction {
                class_name: class_name.to_string(),
                confidence: 0.9,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn registry_with(outcomes: &[Option<&str>], pending: usize) -> ItemRegistry {
        let mut reg = ItemRegistry::new(Arc::new(NoPreview));
        let files = (0..outcomes.len() + pending)
            .map(|i| SourceImage::from_bytes(&format!("p{}.jpg", i), vec![]).unwrap())
            .collect();
        reg.select(files, SelectionMode::Batch).unwrap();

        for (item, outcome) in reg.items_mut().iter_mut().zip(outcomes) {
            item.mark_processing().unwrap();
            match outcome {
                Some(class_name) => item.complete(prediction(class_name)).unwrap(),
                None => item.fail("analysis failed").unwrap(),
            }
        }
        reg
    }

    #[test]
    fn test_counts() {
        let reg = registry_with(
            &[Some("Tomato___healthy"), None, Some("Tomato Leaf Curl"), Some("HEALTHY corn")],
            1,
        );
        let stats = BatchStats::from_items(reg.items());
        assert_eq!(
            stats,
            BatchStats { total: 5, healthy_count: 2, diseased_count: 1, failed_count: 1 }
        );
    }

    #[test]
    fn test_counts_partition_terminal_items() {
        let cases: Vec<Vec<Option<&str>>> = vec![
            vec![],
            vec![None, None],
            vec![Some("Rice Blast"), Some("Rice Healthy"), None],
            vec![Some("a"), Some("b"), Some("c healthy"), None, Some("d")],
        ];
        for outcomes in cases {
            let reg = registry_with(&outcomes, 2);
            let stats = BatchStats::from_items(reg.items());
            let completed = reg.items().iter().filter(|i| i.status() == ItemStatus::Completed).count();
            let errors = reg.items().iter().filter(|i| i.status() == ItemStatus::Error).count();
            assert_eq!(stats.completed_count(), completed);
            assert_eq!(stats.failed_count, errors);
        }
    }

    #[test]
    fn test_is_reportable() {
        assert!(BatchStats::is_reportable(SelectionMode::Batch, 2));
        assert!(!BatchStats::is_reportable(SelectionMode::Batch, 1));
        assert!(!BatchStats::is_reportable(SelectionMode::Single, 1));
    }
}
