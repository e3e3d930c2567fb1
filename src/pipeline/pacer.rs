use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// 既定の画像間ウェイト
pub const DEFAULT_PACE: Duration = Duration::from_millis(500);

/// バッチ解析の画像間ウェイト
///
/// 1件終わるごとに固定時間待ってから次へ進む。0なら待たない。
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn pause(&self) {
        if self.interval.is_zero() {
            return;
        }
        debug!(sleep_ms = self.interval.as_millis() as u64, "次の画像まで待機");
        sleep(self.interval).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACE)
    }
}
