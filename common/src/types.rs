//! 診断結果・履歴の型定義
//!
//! CLIと他のフロントエンドで共有される型:
//! - TopPrediction / PredictionResult: 分類サービスの出力
//! - HistoryRecord: 履歴ストアへの保存リクエスト
//! - HistoryEntry / HistoryStats: 履歴ストアの参照結果

use serde::{Deserialize, Serialize};

/// 上位k件の予測1件分
///
/// top2/top3 は実際にはクラス名と確信度のみを持つが、形は共通。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    #[serde(rename = "class")]
    pub class_name: String,

    pub confidence: f64,

    #[serde(default)]
    pub reason: String,

    #[serde(rename = "tips", default)]
    pub treatment_tips: String,

    #[serde(rename = "fertilizer", default)]
    pub fertilizer_advice: String,
}

/// 分類サービス1回分の出力
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub top1: TopPrediction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top2: Option<TopPrediction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top3: Option<TopPrediction>,

    /// Grad-CAMヒートマップ（data URL）。表示専用で変更しない
    #[serde(
        rename = "gradcam_image",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visual_explanation: Option<String>,
}

impl PredictionResult {
    /// 上位予測を順位順に列挙
    pub fn ranked(&self) -> impl Iterator<Item = &TopPrediction> {
        std::iter::once(&self.top1)
            .chain(self.top2.as_ref())
            .chain(self.top3.as_ref())
    }
}

/// 履歴ストアへの保存リクエスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub image_base64: String,
    pub filename: String,
    pub disease: String,
    pub confidence: f64,
    pub reason: String,
    pub tips: String,
    pub fertilizer: String,
    pub top2_class: Option<String>,
    pub top2_confidence: Option<f64>,
    pub top3_class: Option<String>,
    pub top3_confidence: Option<f64>,
}

impl HistoryRecord {
    /// 予測結果と画像データから保存リクエストを組み立てる
    pub fn from_prediction(
        filename: &str,
        image_base64: String,
        prediction: &PredictionResult,
    ) -> Self {
        let top1 = &prediction.top1;
        Self {
            image_base64,
            filename: filename.to_string(),
            disease: top1.class_name.clone(),
            confidence: top1.confidence,
            reason: top1.reason.clone(),
            tips: top1.treatment_tips.clone(),
            fertilizer: top1.fertilizer_advice.clone(),
            top2_class: prediction.top2.as_ref().map(|p| p.class_name.clone()),
            top2_confidence: prediction.top2.as_ref().map(|p| p.confidence),
            top3_class: prediction.top3.as_ref().map(|p| p.class_name.clone()),
            top3_confidence: prediction.top3.as_ref().map(|p| p.confidence),
        }
    }
}

/// 履歴ストアに保存済みの1件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub prediction_id: String,
    pub filename: String,
    pub disease: String,
    pub confidence: f64,
    pub reason: String,
    pub tips: String,
    pub fertilizer: String,
    pub top2_class: Option<String>,
    pub top2_confidence: Option<f64>,
    pub top3_class: Option<String>,
    pub top3_confidence: Option<f64>,
    /// ISO 8601（UTC）
    pub timestamp: String,
}

/// 履歴の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryStats {
    pub total: u64,
    pub healthy: u64,
    pub diseased: u64,
}

/// 履歴ストアの応答エンベロープ
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreReply {
    pub success: bool,
    pub error: Option<String>,
    pub message: Option<String>,
    pub prediction_id: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub stats: Option<HistoryStats>,
}
