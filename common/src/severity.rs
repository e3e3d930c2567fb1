//! 重症度判定モジュール
//!
//! クラス名と確信度から Low / Medium / High の3段階に振り分ける。
//!
//! Low には「健康と判定」と「確信度不足で判断保留」の2種類があり、
//! tier だけでは区別できない。呼び出し側は `basis` と `description` を
//! 合わせて参照すること。

use serde::{Deserialize, Serialize};

/// High となる確信度の下限（この値を含む）
pub const HIGH_THRESHOLD: f64 = 0.8;
/// Medium となる確信度の下限（この値を含む）
pub const MEDIUM_THRESHOLD: f64 = 0.6;

const HEALTHY_PATTERN: &str = "healthy";

/// 重症度の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityTier {
    Low,
    Medium,
    High,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Low => "Low",
            SeverityTier::Medium => "Medium",
            SeverityTier::High => "High",
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判定の根拠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityBasis {
    /// クラス名が健康を示す
    Healthy,
    /// 病害クラスの確信度による
    Confidence,
}

/// 重症度判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Severity {
    pub tier: SeverityTier,
    pub description: &'static str,
    pub basis: SeverityBasis,
}

/// クラス名が健康を示すか（大文字小文字を無視した部分一致）
pub fn is_healthy(class_name: &str) -> bool {
    class_name.to_lowercase().contains(HEALTHY_PATTERN)
}

/// 重症度を判定
///
/// # Examples
/// ```
/// use crop_ai_common::{severity, SeverityTier};
///
/// assert_eq!(severity("Tomato Blight", 0.85).tier, SeverityTier::High);
/// assert_eq!(severity("Healthy Tomato", 0.95).tier, SeverityTier::Low);
/// ```
pub fn severity(class_name: &str, confidence: f64) -> Severity {
    if is_healthy(class_name) {
        return Severity {
            tier: SeverityTier::Low,
            description: "healthy",
            basis: SeverityBasis::Healthy,
        };
    }

    let (tier, description) = if confidence >= HIGH_THRESHOLD {
        (SeverityTier::High, "immediate attention required")
    } else if confidence >= MEDIUM_THRESHOLD {
        (SeverityTier::Medium, "monitor closely")
    } else {
        (SeverityTier::Low, "uncertain diagnosis")
    };

    Severity {
        tier,
        description,
        basis: SeverityBasis::Confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_cases() {
        assert_eq!(severity("Healthy Tomato", 0.95).tier, SeverityTier::Low);
        assert_eq!(severity("Tomato Blight", 0.85).tier, SeverityTier::High);
        assert_eq!(severity("Tomato Blight", 0.65).tier, SeverityTier::Medium);
        assert_eq!(severity("Tomato Blight", 0.4).tier, SeverityTier::Low);
    }

    #[test]
    fn test_boundaries_resolve_upward() {
        assert_eq!(severity("Corn Rust", 0.8).tier, SeverityTier::High);
        assert_eq!(severity("Corn Rust", 0.6).tier, SeverityTier::Medium);
        assert_eq!(severity("Corn Rust", 0.5999).tier, SeverityTier::Low);
    }

    #[test]
    fn test_two_low_cases_stay_distinct() {
        let healthy = severity("Rice___healthy", 0.3);
        let uncertain = severity("Rice Blast", 0.3);

        assert_eq!(healthy.tier, uncertain.tier);
        assert_ne!(healthy.basis, uncertain.basis);
        assert_eq!(healthy.description, "healthy");
        assert_eq!(uncertain.description, "uncertain diagnosis");
    }

    #[test]
    fn test_healthy_ignores_confidence() {
        let s = severity("POTATO HEALTHY", 0.99);
        assert_eq!(s.tier, SeverityTier::Low);
        assert_eq!(s.basis, SeverityBasis::Healthy);
    }

    #[test]
    fn test_is_healthy() {
        assert!(is_healthy("Tomato___healthy"));
        assert!(is_healthy("Healthy Wheat"));
        assert!(!is_healthy("Wheat Yellow Rust"));
        assert!(!is_healthy(""));
    }
}
