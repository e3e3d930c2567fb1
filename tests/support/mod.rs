//! 結合テスト用のスタブ

#![allow(dead_code)]

use crop_ai_common::{HistoryEntry, HistoryRecord, HistoryStats, PredictionResult, TopPrediction};
use crop_ai_rust::error::{CropAiError, Result};
use crop_ai_rust::history::HistoryStore;
use crop_ai_rust::pipeline::Classifier;
use crop_ai_rust::registry::{ItemId, PreviewStore};
use crop_ai_rust::scanner::SourceImage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn prediction(class_name: &str, confidence: f64) -> PredictionResult {
    PredictionResult {
        top1: TopPrediction {
            class_name: class_name.to_string(),
            confidence,
            reason: "test reason".to_string(),
            treatment_tips: "test tips".to_string(),
            fertilizer_advice: "test fertilizer".to_string(),
        },
        top2: Some(TopPrediction {
            class_name: "Second".to_string(),
            confidence: 0.05,
            ..Default::default()
        }),
        top3: None,
        visual_explanation: None,
    }
}

pub fn images(names: &[&str]) -> Vec<SourceImage> {
    names
        .iter()
        .map(|name| SourceImage::from_bytes(name, name.as_bytes().to_vec()).unwrap())
        .collect()
}

/// ファイル名ごとに結果を決めるスタブ分類器（未登録のファイル名は失敗）
#[derive(Default)]
pub struct StubClassifier {
    labels: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl StubClassifier {
    pub fn new(labels: &[(&str, &str)]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(file, label)| (file.to_string(), label.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    async fn classify(&self, image: &SourceImage) -> Result<PredictionResult> {
        self.calls.lock().unwrap().push(image.file_name.clone());
        match self.labels.get(&image.file_name) {
            Some(label) => Ok(prediction(label, 0.9)),
            None => Err(CropAiError::ClassificationFailed(format!(
                "{}: HTTP 500",
                image.file_name
            ))),
        }
    }
}

/// 確保と解放を記録するプレビューストア
#[derive(Default)]
pub struct LedgerPreviews {
    pub acquired: Mutex<Vec<String>>,
    pub released: Mutex<Vec<String>>,
}

impl PreviewStore for LedgerPreviews {
    fn acquire(&self, id: ItemId, image: &SourceImage) -> Result<String> {
        let location = format!("{}/{}", id, image.file_name);
        self.acquired.lock().unwrap().push(location.clone());
        Ok(location)
    }

    fn release(&self, location: &str) {
        self.released.lock().unwrap().push(location.to_string());
    }
}

/// 保存リクエストを記録するスタブ履歴ストア
#[derive(Default)]
pub struct StubStore {
    pub latency: Duration,
    pub fail_with: Option<String>,
    pub save_calls: AtomicUsize,
    pub records: Mutex<Vec<(HistoryRecord, String)>>,
}

impl StubStore {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

impl HistoryStore for StubStore {
    async fn save(&self, record: &HistoryRecord, token: &str) -> Result<String> {
        let n = self.save_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(CropAiError::History(message.clone()));
        }
        self.records
            .lock()
            .unwrap()
            .push((record.clone(), token.to_string()));
        Ok(format!("pred-{}", n))
    }

    async fn list(&self, _token: &str) -> Result<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    async fn stats(&self, _token: &str) -> Result<HistoryStats> {
        Ok(HistoryStats::default())
    }

    async fn delete(&self, _prediction_id: &str, _token: &str) -> Result<()> {
        Ok(())
    }
}
