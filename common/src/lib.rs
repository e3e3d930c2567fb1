//! Crop AI Common Library
//!
//! CLIと他のフロントエンドで共有される型とユーティリティ

pub mod error;
pub mod history;
pub mod parser;
pub mod severity;
pub mod types;

pub use error::{Error, Result};
pub use history::{summarize, HistoryFilter};
pub use parser::parse_prediction_response;
pub use severity::{is_healthy, severity, Severity, SeverityBasis, SeverityTier};
pub use types::{
    HistoryEntry, HistoryRecord, HistoryStats, PredictionResult, StoreReply, TopPrediction,
};
