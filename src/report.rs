//! 解析結果の出力
//!
//! - 画面表示（上位3件・重症度・対処法）
//! - JSONレポート
//! - Grad-CAMヒートマップの画像ファイル書き出し

use crate::error::Result;
use crate::registry::{Item, ItemId, ItemRegistry, ItemStatus};
use crate::stats::BatchStats;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crop_ai_common::{severity, PredictionResult, Severity};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 1枚分のレポート
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub id: ItemId,
    pub file_name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap_path: Option<String>,
}

impl ItemReport {
    pub fn from_item(item: &Item) -> Self {
        // ヒートマップ本体はファイルに出すのでJSONには含めない
        let prediction = item.prediction().map(|p| PredictionResult {
            visual_explanation: None,
            ..p.clone()
        });
        Self {
            id: item.id(),
            file_name: item.file_name().to_string(),
            status: item.status(),
            severity: item
                .prediction()
                .map(|p| severity(&p.top1.class_name, p.top1.confidence)),
            prediction,
            error_detail: item.error_detail().map(str::to_string),
            heatmap_path: None,
        }
    }
}

/// バッチ全体のレポート
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub mode: &'static str,
    pub items: Vec<ItemReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BatchStats>,
}

impl BatchReport {
    pub fn from_registry(registry: &ItemRegistry) -> Self {
        let stats = BatchStats::is_reportable(registry.mode(), registry.len())
            .then(|| BatchStats::from_items(registry.items()));
        Self {
            mode: registry.mode().as_str(),
            items: registry.items().iter().map(ItemReport::from_item).collect(),
            stats,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Data URLからMIMEタイプとデータを取り出す
///
/// "data:image/png;base64,iVBOR..." → ("image/png", バイト列)
pub fn decode_data_url(data_url: &str) -> Option<(&str, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type, bytes))
}

/// Grad-CAMヒートマップを `<元ファイル名>-<画像ID>-gradcam.<ext>` として書き出す
///
/// ヒートマップのない画像、デコードできない画像は飛ばす。
pub fn write_heatmaps(registry: &ItemRegistry, report: &mut BatchReport, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut written = 0;

    for (item, item_report) in registry.items().iter().zip(report.items.iter_mut()) {
        let Some(data_url) = item.prediction().and_then(|p| p.visual_explanation.as_deref()) else {
            continue;
        };
        let Some((mime_type, bytes)) = decode_data_url(data_url) else {
            tracing::warn!(file = item.file_name(), "ヒートマップのデコードに失敗");
            continue;
        };

        let path = heatmap_path(dir, item.id(), item.file_name(), mime_type);
        std::fs::write(&path, bytes)?;
        item_report.heatmap_path = Some(path.display().to_string());
        written += 1;
    }

    Ok(written)
}

/// 同じ名前の画像（leaf.jpg と leaf.png など）でも上書きしないよう画像IDを付ける
fn heatmap_path(dir: &Path, id: ItemId, file_name: &str, mime_type: &str) -> PathBuf {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let ext = match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        _ => "png",
    };
    dir.join(format!("{}-{}-gradcam.{}", stem, id, ext))
}

/// 1枚分の結果を表示
pub fn print_item(index: usize, item: &Item) {
    let icon = match item.status() {
        ItemStatus::Completed => "✔",
        ItemStatus::Error => "✘",
        ItemStatus::Pending | ItemStatus::Processing => "…",
    };
    println!("[{}] {} {}", index + 1, icon, item.file_name());

    if let Some(detail) = item.error_detail() {
        println!("    エラー: {}", detail);
        return;
    }
    let Some(prediction) = item.prediction() else {
        return;
    };

    let top1 = &prediction.top1;
    let s = severity(&top1.class_name, top1.confidence);
    println!(
        "    診断: {} ({:.1}%)  重症度: {} - {}",
        top1.class_name,
        top1.confidence * 100.0,
        s.tier,
        s.description
    );
    for (rank, p) in prediction.ranked().enumerate().skip(1) {
        println!("    候補{}: {} ({:.1}%)", rank + 1, p.class_name, p.confidence * 100.0);
    }
    if !top1.reason.is_empty() {
        println!("    原因: {}", top1.reason);
    }
    if !top1.treatment_tips.is_empty() {
        println!("    対処: {}", top1.treatment_tips);
    }
    if !top1.fertilizer_advice.is_empty() {
        println!("    施肥: {}", top1.fertilizer_advice);
    }
}

pub fn print_stats(stats: &BatchStats) {
    println!(
        "集計: {}枚中 健康 {} / 病害 {} / 失敗 {}",
        stats.total, stats.healthy_count, stats.diseased_count, stats.failed_count
    );
}
