//! 履歴の絞り込み

use crate::severity::is_healthy;
use crate::types::{HistoryEntry, HistoryStats};

/// 履歴一覧の絞り込み条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryFilter {
    #[default]
    All,
    Healthy,
    Diseased,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::Healthy => is_healthy(&entry.disease),
            HistoryFilter::Diseased => !is_healthy(&entry.disease),
        }
    }

    pub fn apply<'a>(&self, entries: &'a [HistoryEntry]) -> Vec<&'a HistoryEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

impl std::str::FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(HistoryFilter::All),
            "healthy" => Ok(HistoryFilter::Healthy),
            "diseased" => Ok(HistoryFilter::Diseased),
            _ => Err(format!("Unknown filter: {}. Use all, healthy, or diseased", s)),
        }
    }
}

/// 手元の履歴一覧から集計を計算（ストアの /stats と同じ規則）
pub fn summarize(entries: &[HistoryEntry]) -> HistoryStats {
    let total = entries.len() as u64;
    let healthy = entries.iter().filter(|e| is_healthy(&e.disease)).count() as u64;
    HistoryStats {
        total,
        healthy,
        diseased: total - healthy,
    }
}
