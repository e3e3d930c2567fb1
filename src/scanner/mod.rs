use crate::error::{CropAiError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 選択された画像1枚分の元データ
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    /// メモリ上のデータから作成（拡張子からMIMEタイプを決める）
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Self> {
        let mime_type = mime_for(Path::new(file_name))
            .ok_or_else(|| CropAiError::UnsupportedFile(file_name.to_string()))?;
        Ok(Self {
            path: PathBuf::from(file_name),
            file_name: file_name.to_string(),
            mime_type,
            bytes,
        })
    }

    fn read(path: &Path, mime_type: &'static str) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime_type,
            bytes,
        })
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// 指定パスから画像を読み込む
///
/// - ファイル: 画像でなければ `UnsupportedFile`
/// - フォルダ: 直下の画像のみ（ファイル名順）、画像以外は無視
pub fn load_selection(paths: &[PathBuf]) -> Result<Vec<SourceImage>> {
    let mut images = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(CropAiError::FileNotFound(path.display().to_string()));
        }

        if path.is_dir() {
            images.extend(scan_folder(path)?);
            continue;
        }

        let mime_type = mime_for(path)
            .ok_or_else(|| CropAiError::UnsupportedFile(path.display().to_string()))?;
        images.push(SourceImage::read(path, mime_type)?);
    }

    Ok(images)
}

fn scan_folder(folder: &Path) -> Result<Vec<SourceImage>> {
    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(mime_type) = mime_for(path) {
            images.push(SourceImage::read(path, mime_type)?);
        }
    }

    Ok(images)
}
