// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// InnerTube への通信で使用する共通の設定値・定数を定義
// =============================================================================

use serde::Deserialize;
use std::time::Duration;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// InnerTube は応答が詰まることがあるため、適切にタイムアウトさせて
/// ペルソナのフォールバックへ進めるようにする。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// InnerTube API のベースURL
pub const INNERTUBE_API_BASE: &str = "https://www.youtube.com/youtubei/v1";

/// 視聴ページのベースURL
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// デフォルトのUser-Agent（デスクトップChrome）
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 視聴ページ取得の最大試行回数
///
/// パース不能なページは一時的な不具合として扱い、この回数まで再取得する
pub const WATCH_PAGE_MAX_ATTEMPTS: u32 = 5;

/// リクエストボディに入れる言語・地域
pub const DEFAULT_HL: &str = "en";
pub const DEFAULT_GL: &str = "US";

/// リゾルバの設定
///
/// 設定ファイルから読み込めるように `Deserialize` を実装している。
/// 省略されたフィールドはデフォルト値で補完される。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// 視聴ページ取得の最大試行回数
    pub watch_page_max_attempts: u32,
    /// 再試行間隔の初期値（ミリ秒）
    pub retry_base_delay_ms: u64,
    /// 再試行間隔の上限（ミリ秒）
    pub retry_max_delay_ms: u64,
    /// HTTPタイムアウト（秒）
    pub http_timeout_secs: u64,
    /// 表示言語
    pub hl: String,
    /// 地域
    pub gl: String,
}

impl ResolverConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// 再試行の待機なしの設定（テスト・バッチ処理用）
    pub fn without_retry_delay() -> Self {
        Self {
            retry_base_delay_ms: 0,
            retry_max_delay_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            watch_page_max_attempts: WATCH_PAGE_MAX_ATTEMPTS,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 4000,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            hl: DEFAULT_HL.to_string(),
            gl: DEFAULT_GL.to_string(),
        }
    }
}
