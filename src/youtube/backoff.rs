use std::time::Duration;

use crate::config::ResolverConfig;

/// 指数バックオフを管理する構造体
///
/// 再試行間隔を指数的に増加させる（base→2base→4base...、max_delayで頭打ち）。
/// 試行回数の上限もここで管理し、上限到達後は `should_retry` が false になる。
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// カスタム設定でExponentialBackoffインスタンスを作成
    pub fn with_config(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            current_attempt: 0,
        }
    }

    /// 視聴ページ取得用のバックオフを設定から作成
    pub fn for_watch_page(config: &ResolverConfig) -> Self {
        Self::with_config(
            config.retry_base_delay(),
            config.retry_max_delay(),
            config.watch_page_max_attempts,
        )
    }

    /// 次の再試行までの待機時間を計算して返す
    ///
    /// 計算式: base_delay * 2^current_attempt（max_delayで頭打ち）
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.checked_pow(self.current_attempt).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        self.current_attempt += 1;
        delay.min(self.max_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 最大試行回数に達したかどうかを確認
    pub fn has_exceeded_max_attempts(&self) -> bool {
        self.current_attempt >= self.max_attempts
    }

    /// 再試行を続行すべきかどうかを確認
    pub fn should_retry(&self) -> bool {
        !self.has_exceeded_max_attempts()
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::for_watch_page(&ResolverConfig::default())
    }
}
