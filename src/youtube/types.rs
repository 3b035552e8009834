use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::YouTubeError;

// =============================================================================
// 識別子
// =============================================================================

static VIDEO_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w-]{11}$").expect("Failed to compile video id regex"));

/// 動画URLのパターン（watch / youtu.be / embed / shorts / live）
static VIDEO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|live/|v/)|youtu\.be/)([\w-]{11})",
    )
    .expect("Failed to compile video url regex")
});

static CHANNEL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^UC[\w-]{22}$").expect("Failed to compile channel id regex"));

static CHANNEL_ID_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/channel/(UC[\w-]{22})").expect("Failed to compile channel url regex")
});

static HANDLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]{3,30}$").expect("Failed to compile handle regex"));

static HANDLE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/@([\w.-]{3,30})").expect("Failed to compile handle url regex")
});

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w-]+$").expect("Failed to compile slug regex"));

static SLUG_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/c/([\w-]+)").expect("Failed to compile slug url regex")
});

static USER_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z]{1,20}$").expect("Failed to compile user name regex"));

static USER_NAME_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/user/([0-9A-Za-z]{1,20})")
        .expect("Failed to compile user name url regex")
});

/// 生の値またはURLから識別子を取り出す
fn parse_identifier(
    kind: &'static str,
    input: &str,
    raw: &Regex,
    url: &Regex,
) -> Result<String, YouTubeError> {
    let input = input.trim();
    if raw.is_match(input) {
        return Ok(input.to_string());
    }
    url.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| YouTubeError::InvalidIdentifier {
            kind,
            value: input.to_string(),
        })
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = YouTubeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

identifier!(
    /// 動画ID（11文字）
    VideoId
);
identifier!(
    /// チャンネルID（"UC" + 22文字）
    ChannelId
);
identifier!(
    /// ハンドル（"@"を除いた部分）
    ChannelHandle
);
identifier!(
    /// カスタムURLのスラッグ（/c/xxx）
    ChannelSlug
);
identifier!(
    /// 旧ユーザー名（/user/xxx）
    UserName
);

impl VideoId {
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        parse_identifier("video id", input, &VIDEO_ID_REGEX, &VIDEO_URL_REGEX).map(Self)
    }
}

impl ChannelId {
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        parse_identifier("channel id", input, &CHANNEL_ID_REGEX, &CHANNEL_ID_URL_REGEX).map(Self)
    }
}

impl ChannelHandle {
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        let input = input.trim();
        let input = input.strip_prefix('@').unwrap_or(input);
        parse_identifier("channel handle", input, &HANDLE_REGEX, &HANDLE_URL_REGEX).map(Self)
    }

    pub fn url(&self) -> String {
        format!("{}/@{}", crate::config::YOUTUBE_BASE_URL, self.0)
    }
}

impl ChannelSlug {
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        parse_identifier("channel slug", input, &SLUG_REGEX, &SLUG_URL_REGEX).map(Self)
    }

    pub fn url(&self) -> String {
        format!("{}/c/{}", crate::config::YOUTUBE_BASE_URL, self.0)
    }
}

impl UserName {
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        parse_identifier("user name", input, &USER_NAME_REGEX, &USER_NAME_URL_REGEX).map(Self)
    }

    pub fn url(&self) -> String {
        format!("{}/user/{}", crate::config::YOUTUBE_BASE_URL, self.0)
    }
}

/// チャンネルの指定方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLocator {
    Id(ChannelId),
    Handle(ChannelHandle),
    Slug(ChannelSlug),
    User(UserName),
}

impl ChannelLocator {
    /// 入力文字列から指定方法を推定（ID → ハンドル → スラッグURL → ユーザーURL の順）
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        let input = input.trim();
        if let Ok(id) = ChannelId::parse(input) {
            return Ok(ChannelLocator::Id(id));
        }
        if input.starts_with('@') || HANDLE_URL_REGEX.is_match(input) {
            return ChannelHandle::parse(input).map(ChannelLocator::Handle);
        }
        if SLUG_URL_REGEX.is_match(input) {
            return ChannelSlug::parse(input).map(ChannelLocator::Slug);
        }
        if USER_NAME_URL_REGEX.is_match(input) {
            return UserName::parse(input).map(ChannelLocator::User);
        }
        Err(YouTubeError::InvalidIdentifier {
            kind: "channel locator",
            value: input.to_string(),
        })
    }

    /// ログ・エラー用の表示名
    pub fn describe(&self) -> String {
        match self {
            ChannelLocator::Id(id) => id.to_string(),
            ChannelLocator::Handle(handle) => format!("@{}", handle),
            ChannelLocator::Slug(slug) => format!("c/{}", slug),
            ChannelLocator::User(user) => format!("user/{}", user),
        }
    }
}

/// 継続トークン（サーバー発行の不透明な文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// 解決結果
// =============================================================================

/// 利用可否
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// 解決済みリソース
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResource<T> {
    pub id: String,
    pub availability: Availability,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// 視聴ページから抽出した情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchPage {
    pub video_id: String,
    /// プレイヤーJSのURL（署名タイムスタンプの取得元）
    pub player_source_url: Option<String>,
    pub api_key: Option<String>,
    pub like_count: Option<u64>,
    /// ページに埋め込まれたプレイヤーレスポンス
    pub player: Option<PlayerMetadata>,
}

/// プレイヤーレスポンスから抽出したメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMetadata {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub channel_id: String,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
    pub keywords: Vec<String>,
    pub short_description: String,
    pub is_live: bool,
    pub upload_date: Option<DateTime<Utc>>,
    pub thumbnails: Vec<Thumbnail>,
    /// 取得に使ったペルソナ名
    pub persona: Option<String>,
}

/// チャンネル基本情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub thumbnails: Vec<Thumbnail>,
}

impl Channel {
    pub fn url(&self) -> String {
        format!("{}/channel/{}", crate::config::YOUTUBE_BASE_URL, self.id)
    }
}

/// ヘッダー等から取得できる拡張情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelExtension {
    pub handle: Option<String>,
    pub description: String,
    pub video_count: Option<u64>,
    pub subscriber_count: Option<u64>,
    pub banners: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub channel: Channel,
    pub extension: Option<ChannelExtension>,
}

// =============================================================================
// コメント
// =============================================================================

/// テキスト上の範囲（UTF-16単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRun {
    pub start_index: usize,
    pub length: usize,
}

impl CommandRun {
    pub fn new(start_index: usize, length: usize) -> Self {
        Self {
            start_index,
            length,
        }
    }

    pub fn end(&self) -> usize {
        self.start_index + self.length
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    /// テキスト断片（改行は "\n" / "\r\n" 単独の断片）
    pub text_segments: Vec<String>,
    pub replies_token: Option<ContinuationToken>,
    pub like_count: u64,
}

impl Comment {
    /// 断片を連結した元のテキスト
    pub fn text(&self) -> String {
        self.text_segments.concat()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBatch {
    pub comments: Vec<Comment>,
    pub next_token: Option<ContinuationToken>,
}
