//! クライアントペルソナとリクエスト構築
//!
//! InnerTube は申告されたクライアント（ペルソナ）ごとに挙動・制限が異なる。
//! ペルソナは静的なレジストリとして定義し、構築後に変更しない。

use serde_json::{json, Value};

use crate::config::{self, ResolverConfig};
use crate::youtube::errors::YouTubeError;
use crate::youtube::transport::RequestDescriptor;

/// Androidを装う際のUser-Agent
/// 無いと失敗することがある（https://github.com/iv-org/invidious/issues/3230）
const ANDROID_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; SM-G981B) gzip";

/// ペルソナ固有のヒント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformHints {
    pub user_agent: Option<&'static str>,
    pub android_sdk_version: Option<u32>,
    /// 埋め込みプレイヤーとして振る舞う場合の埋め込み元
    pub embed_url: Option<&'static str>,
}

/// クライアントペルソナ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientPersona {
    pub name: &'static str,
    pub version: &'static str,
    pub hints: PlatformHints,
    /// 年齢制限付きコンテンツを取得できるか
    pub supports_age_restricted: bool,
    /// 署名タイムスタンプが必要か（署名解読が必要なペルソナ）
    pub requires_signature_timestamp: bool,
}

/// モバイルWeb。署名解読が不要なため最初に試す。
pub static MWEB: ClientPersona = ClientPersona {
    name: "MWEB",
    version: "2.20230420.05.00",
    hints: PlatformHints {
        user_agent: Some(ANDROID_USER_AGENT),
        android_sdk_version: Some(30),
        embed_url: None,
    },
    supports_age_restricted: false,
    requires_signature_timestamp: false,
};

/// デスクトップWeb。コメントの継続取得に使う。
pub static WEB: ClientPersona = ClientPersona {
    name: "WEB",
    version: "2.20230421.01.00",
    hints: PlatformHints {
        user_agent: None,
        android_sdk_version: None,
        embed_url: None,
    },
    supports_age_restricted: false,
    requires_signature_timestamp: false,
};

/// TV埋め込みプレイヤー。年齢制限付きでも取得できるフォールバック。
pub static TV_EMBEDDED: ClientPersona = ClientPersona {
    name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    version: "2.0",
    hints: PlatformHints {
        user_agent: None,
        android_sdk_version: None,
        embed_url: Some("https://www.youtube.com"),
    },
    supports_age_restricted: true,
    requires_signature_timestamp: true,
};

/// 登録済みペルソナ
pub static PERSONAS: [&ClientPersona; 3] = [&MWEB, &WEB, &TV_EMBEDDED];

/// プレイヤーメタデータのデフォルト優先順
pub static DEFAULT_PLAYER_ORDER: [&ClientPersona; 2] = [&MWEB, &TV_EMBEDDED];

/// チャンネルメタデータのデフォルト優先順
pub static DEFAULT_CHANNEL_ORDER: [&ClientPersona; 2] = [&MWEB, &WEB];

impl ClientPersona {
    pub fn by_name(name: &str) -> Option<&'static ClientPersona> {
        PERSONAS.iter().copied().find(|p| p.name == name)
    }
}

/// リクエストの種類と必要なパラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestParams<'a> {
    Player {
        video_id: &'a str,
        signature_timestamp: Option<&'a str>,
    },
    Next {
        video_id: &'a str,
    },
    Continuation {
        token: &'a str,
    },
    Browse {
        browse_id: &'a str,
        params: Option<&'a str>,
    },
    ResolveUrl {
        url: &'a str,
    },
}

impl RequestParams<'_> {
    fn endpoint(&self) -> &'static str {
        match self {
            RequestParams::Player { .. } => "player",
            RequestParams::Next { .. } | RequestParams::Continuation { .. } => "next",
            RequestParams::Browse { .. } => "browse",
            RequestParams::ResolveUrl { .. } => "navigation/resolve_url",
        }
    }
}

/// ペルソナとパラメータからリクエストを組み立てる（I/Oなし）
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    api_base: String,
    hl: String,
    gl: String,
}

impl RequestBuilder {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            api_base: config::INNERTUBE_API_BASE.to_string(),
            hl: config.hl.clone(),
            gl: config.gl.clone(),
        }
    }

    pub fn build(
        &self,
        persona: &ClientPersona,
        params: &RequestParams<'_>,
    ) -> Result<RequestDescriptor, YouTubeError> {
        let mut body = json!({ "context": self.context(persona) });

        match *params {
            RequestParams::Player {
                video_id,
                signature_timestamp,
            } => {
                body["videoId"] = json!(video_id);
                if let Some(sts) = signature_timestamp {
                    if !persona.requires_signature_timestamp {
                        return Err(YouTubeError::UnsupportedParameter {
                            persona: persona.name,
                            parameter: "signatureTimestamp",
                        });
                    }
                    body["playbackContext"] = json!({
                        "contentPlaybackContext": { "signatureTimestamp": sts }
                    });
                }
            }
            RequestParams::Next { video_id } => {
                body["videoId"] = json!(video_id);
            }
            RequestParams::Continuation { token } => {
                body["continuation"] = json!(token);
            }
            RequestParams::Browse { browse_id, params } => {
                body["browseId"] = json!(browse_id);
                if let Some(params) = params {
                    body["params"] = json!(params);
                }
            }
            RequestParams::ResolveUrl { url } => {
                body["url"] = json!(url);
            }
        }

        let url = format!("{}/{}", self.api_base, params.endpoint());
        let mut request = RequestDescriptor::post(url, body)
            .header("Content-Type", "application/json")
            .header("Origin", config::YOUTUBE_BASE_URL);
        if let Some(user_agent) = persona.hints.user_agent {
            request = request.header("User-Agent", user_agent);
        }

        Ok(request)
    }

    fn context(&self, persona: &ClientPersona) -> Value {
        let mut client = json!({
            "clientName": persona.name,
            "clientVersion": persona.version,
            "hl": self.hl,
            "gl": self.gl,
            "utcOffsetMinutes": 0
        });
        if let Some(sdk) = persona.hints.android_sdk_version {
            client["androidSdkVersion"] = json!(sdk);
        }

        let mut context = json!({ "client": client });
        if let Some(embed_url) = persona.hints.embed_url {
            context["thirdParty"] = json!({ "embedUrl": embed_url });
        }
        context
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

/// 視聴ページ取得リクエスト（ペルソナ非依存のGET）
pub fn watch_page_request(video_id: &str) -> RequestDescriptor {
    RequestDescriptor::get(format!(
        "{}/watch?v={}&bpctr=9999999999",
        config::YOUTUBE_BASE_URL,
        video_id
    ))
    .header("Accept-Language", "en-US,en;q=0.9")
}
