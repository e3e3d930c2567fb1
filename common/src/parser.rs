//! 分類サービスのレスポンスパーサー
//!
//! `/predict` の応答JSONを PredictionResult に変換する。
//! 成功フラグ・エラーキー・確信度の範囲を検査し、
//! 不正な応答はすべてパースエラーとして扱う。

use crate::error::{Error, Result};
use crate::types::{PredictionResult, TopPrediction};
use serde::Deserialize;

/// `/predict` の応答（検査前）
#[derive(Debug, Deserialize)]
struct PredictEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    top1: Option<TopPrediction>,
    #[serde(default)]
    top2: Option<TopPrediction>,
    #[serde(default)]
    top3: Option<TopPrediction>,
    #[serde(default)]
    gradcam_image: Option<String>,
}

/// 分類サービスの応答をパース
///
/// # Arguments
/// * `body` - レスポンスボディ
///
/// # Returns
/// * `Ok(PredictionResult)` - パース成功
/// * `Err` - JSONでない / top1がない / 失敗応答 / 確信度が[0,1]外
///
/// # Examples
/// ```
/// use crop_ai_common::parse_prediction_response;
///
/// let body = r#"{"top1": {"class": "Corn Healthy", "confidence": 0.97}}"#;
/// let result = parse_prediction_response(body).unwrap();
/// assert_eq!(result.top1.class_name, "Corn Healthy");
/// ```
pub fn parse_prediction_response(body: &str) -> Result<PredictionResult> {
    let envelope: PredictEnvelope = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("予測JSONパースエラー: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(Error::Parse(format!("サービスエラー: {}", error)));
    }
    if envelope.success == Some(false) {
        return Err(Error::Parse("success=false".into()));
    }

    let top1 = envelope
        .top1
        .ok_or_else(|| Error::Parse("top1がありません".into()))?;

    let result = PredictionResult {
        top1,
        top2: envelope.top2,
        top3: envelope.top3,
        visual_explanation: envelope.gradcam_image.filter(|s| !s.is_empty()),
    };

    for p in result.ranked() {
        if !(0.0..=1.0).contains(&p.confidence) {
            return Err(Error::Parse(format!(
                "確信度が範囲外: {} = {}",
                p.class_name, p.confidence
            )));
        }
    }

    Ok(result)
}
