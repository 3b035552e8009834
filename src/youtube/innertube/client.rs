//! InnerTube API クライアント実装
//!
//! 視聴ページは回数制限つきで再取得する。プレイヤー・チャンネルは再試行せず、
//! 優先順に並べたペルソナを1つずつ試す（並列には投げない）。

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::parser::{self, Parsed};
use super::persona::{
    self, ClientPersona, RequestBuilder, RequestParams, DEFAULT_CHANNEL_ORDER,
    DEFAULT_PLAYER_ORDER,
};
use crate::config::ResolverConfig;
use crate::youtube::backoff::ExponentialBackoff;
use crate::youtube::errors::YouTubeError;
use crate::youtube::state::ResolutionTracker;
use crate::youtube::transport::{ReqwestTransport, RequestDescriptor, Transport};
use crate::youtube::types::{
    Availability, ChannelLocator, ChannelMetadata, PlayerMetadata, ResolvedResource, VideoId,
    WatchPage,
};

/// チャンネルの「概要」タブを指す browse パラメータ
const CHANNEL_ABOUT_PARAMS: &str = "EgVhYm91dPIGBAoCEgA%3D";

/// InnerTube APIクライアント
///
/// 呼び出し間で可変状態を共有しないため、`Arc` で包んで複数タスクから同時に使える。
pub struct InnerTubeClient {
    transport: Arc<dyn Transport>,
    config: ResolverConfig,
    builder: RequestBuilder,
}

impl InnerTubeClient {
    /// reqwest トランスポートでクライアントを作成
    ///
    /// # Errors
    /// HTTPクライアントのビルドに失敗した場合にエラーを返す
    pub fn new(config: ResolverConfig) -> Result<Self, YouTubeError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: ResolverConfig) -> Self {
        let builder = RequestBuilder::new(&config);
        Self {
            transport,
            config,
            builder,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub(crate) fn build_request(
        &self,
        persona: &ClientPersona,
        params: &RequestParams<'_>,
    ) -> Result<RequestDescriptor, YouTubeError> {
        self.builder.build(persona, params)
    }

    /// 1回送受信してJSONとして読む
    ///
    /// JSONとして読めない応答は通信途中の破損とみなし `NetworkError` にする。
    pub(crate) async fn exchange_json(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Value, YouTubeError> {
        let bytes = self.transport.exchange(request, cancel).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            YouTubeError::NetworkError(format!("Invalid JSON from {}: {}", request.url, e))
        })
    }

    // =========================================================================
    // 視聴ページ
    // =========================================================================

    pub async fn resolve_watch_page(
        &self,
        video_id: &VideoId,
    ) -> Result<ResolvedResource<WatchPage>, YouTubeError> {
        self.resolve_watch_page_with_cancel(video_id, &CancellationToken::new())
            .await
    }

    /// 視聴ページを取得して解決
    ///
    /// ページ自体を読めなかった場合（またはネットワークエラー）だけ再取得する。
    /// 利用不可と読めたページは終端として即座に `ResourceUnavailable` を返す。
    pub async fn resolve_watch_page_with_cancel(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> Result<ResolvedResource<WatchPage>, YouTubeError> {
        let id = video_id.as_str();
        let request = persona::watch_page_request(id);
        let mut backoff = ExponentialBackoff::for_watch_page(&self.config);
        let mut tracker = ResolutionTracker::new(id);

        loop {
            if cancel.is_cancelled() {
                return Err(YouTubeError::Cancelled);
            }
            let attempt = tracker.begin_attempt();
            log::debug!(
                "Fetching watch page for {} (attempt {}/{})",
                id,
                attempt,
                backoff.max_attempts()
            );

            match self.transport.exchange(&request, cancel).await {
                Ok(bytes) => {
                    let html = String::from_utf8_lossy(&bytes);
                    match parser::parse_watch_page(id, &html) {
                        Some(Parsed::Available(page)) => {
                            tracker.resolve();
                            return Ok(ResolvedResource {
                                id: id.to_string(),
                                availability: Availability::Available,
                                payload: page,
                            });
                        }
                        Some(Parsed::Unavailable(reason)) => {
                            tracker.mark_unavailable();
                            return Err(YouTubeError::unavailable(id, reason));
                        }
                        None => log::warn!("Watch page for {} could not be parsed", id),
                    }
                }
                Err(e) if e.is_retryable() => {
                    log::warn!("Watch page request for {} failed: {}", id, e);
                }
                Err(e) => {
                    tracker.fail();
                    return Err(e);
                }
            }

            let delay = backoff.next_delay();
            if !backoff.should_retry() {
                let attempts = tracker.attempts();
                tracker.fail();
                log::error!("Giving up on watch page for {} after {} attempts", id, attempts);
                // 最後の失敗の種類によらず一時的な取得失敗として返す
                return Err(YouTubeError::TransientFetchFailure {
                    resource: id.to_string(),
                    attempts,
                });
            }

            tracker.retry();
            tokio::select! {
                _ = cancel.cancelled() => return Err(YouTubeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    // =========================================================================
    // プレイヤー
    // =========================================================================

    /// デフォルトのペルソナ順（MWEB → TV埋め込み）でプレイヤー情報を解決
    pub async fn resolve_player_metadata(
        &self,
        video_id: &VideoId,
    ) -> Result<ResolvedResource<PlayerMetadata>, YouTubeError> {
        self.resolve_player_metadata_with(
            video_id,
            &DEFAULT_PLAYER_ORDER,
            None,
            &CancellationToken::new(),
        )
        .await
    }

    /// ペルソナ順を指定してプレイヤー情報を解決
    ///
    /// `signature_timestamp` は署名解読を要するペルソナにだけ渡す。
    pub async fn resolve_player_metadata_with(
        &self,
        video_id: &VideoId,
        personas: &[&'static ClientPersona],
        signature_timestamp: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResolvedResource<PlayerMetadata>, YouTubeError> {
        let id = video_id.as_str();
        let (mut metadata, persona) = self
            .with_persona_fallback(id, personas, cancel, |persona| {
                self.player_attempt(persona, id, signature_timestamp, cancel)
            })
            .await?;

        metadata.persona = Some(persona.name.to_string());
        Ok(ResolvedResource {
            id: id.to_string(),
            availability: Availability::Available,
            payload: metadata,
        })
    }

    async fn player_attempt(
        &self,
        persona: &'static ClientPersona,
        video_id: &str,
        signature_timestamp: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Parsed<PlayerMetadata>, YouTubeError> {
        let params = RequestParams::Player {
            video_id,
            signature_timestamp: signature_timestamp
                .filter(|_| persona.requires_signature_timestamp),
        };
        let request = self.build_request(persona, &params)?;
        let value = self.exchange_json(&request, cancel).await?;
        parser::parse_player_response(&value)
    }

    // =========================================================================
    // チャンネル
    // =========================================================================

    /// デフォルトのペルソナ順（MWEB → WEB）でチャンネル情報を解決
    pub async fn resolve_channel_metadata(
        &self,
        locator: &ChannelLocator,
    ) -> Result<ResolvedResource<ChannelMetadata>, YouTubeError> {
        self.resolve_channel_metadata_with(locator, &DEFAULT_CHANNEL_ORDER, &CancellationToken::new())
            .await
    }

    pub async fn resolve_channel_metadata_with(
        &self,
        locator: &ChannelLocator,
        personas: &[&'static ClientPersona],
        cancel: &CancellationToken,
    ) -> Result<ResolvedResource<ChannelMetadata>, YouTubeError> {
        let description = locator.describe();
        let (metadata, _) = self
            .with_persona_fallback(&description, personas, cancel, |persona| {
                self.channel_attempt(persona, locator, cancel)
            })
            .await?;

        Ok(ResolvedResource {
            id: metadata.channel.id.clone(),
            availability: Availability::Available,
            payload: metadata,
        })
    }

    /// チャンネルIDならそのまま browse、それ以外はURLを browseId に解決してから browse
    async fn channel_attempt(
        &self,
        persona: &'static ClientPersona,
        locator: &ChannelLocator,
        cancel: &CancellationToken,
    ) -> Result<Parsed<ChannelMetadata>, YouTubeError> {
        let browse_id = match locator {
            ChannelLocator::Id(id) => id.as_str().to_string(),
            ChannelLocator::Handle(handle) => {
                self.resolve_browse_id(persona, &handle.url(), cancel).await?
            }
            ChannelLocator::Slug(slug) => self.resolve_browse_id(persona, &slug.url(), cancel).await?,
            ChannelLocator::User(user) => self.resolve_browse_id(persona, &user.url(), cancel).await?,
        };

        let request = self.build_request(
            persona,
            &RequestParams::Browse {
                browse_id: &browse_id,
                params: Some(CHANNEL_ABOUT_PARAMS),
            },
        )?;
        let value = self.exchange_json(&request, cancel).await?;
        parser::parse_channel_response(&value)
    }

    /// チャンネルページのURLを browseId に解決
    async fn resolve_browse_id(
        &self,
        persona: &ClientPersona,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, YouTubeError> {
        let request = self.build_request(persona, &RequestParams::ResolveUrl { url })?;
        let value = self.exchange_json(&request, cancel).await?;
        let browse_id = parser::parse_resolved_browse_id(&value)?;
        log::debug!("Resolved {} to {}", url, browse_id);
        Ok(browse_id)
    }

    // =========================================================================
    // ペルソナのフォールバック
    // =========================================================================

    /// ペルソナを優先順に1つずつ試す
    ///
    /// - 利用可能な結果が得られたらそこで終了
    /// - 利用不可・ネットワークエラーは次のペルソナへ（同じペルソナは再試行しない）
    /// - 形が壊れた応答・キャンセルは即座に終了
    ///
    /// 全滅時は、利用不可を返したペルソナがあれば `ResourceUnavailable`、
    /// なければ最後のネットワークエラーを返す。
    async fn with_persona_fallback<T, F, Fut>(
        &self,
        resource: &str,
        personas: &[&'static ClientPersona],
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<(T, &'static ClientPersona), YouTubeError>
    where
        F: FnMut(&'static ClientPersona) -> Fut,
        Fut: Future<Output = Result<Parsed<T>, YouTubeError>>,
    {
        if personas.is_empty() {
            return Err(YouTubeError::UnsupportedParameter {
                persona: "(none)",
                parameter: "personaOrder",
            });
        }

        let mut tracker = ResolutionTracker::new(resource);
        let mut unavailable_reason: Option<String> = None;
        let mut last_error: Option<YouTubeError> = None;

        for &persona in personas {
            if cancel.is_cancelled() {
                tracker.fail();
                return Err(YouTubeError::Cancelled);
            }
            let attempt_no = tracker.begin_attempt();
            log::debug!(
                "Resolving {} with persona {} ({}/{})",
                resource,
                persona.name,
                attempt_no,
                personas.len()
            );

            match attempt(persona).await {
                Ok(Parsed::Available(value)) => {
                    tracker.resolve();
                    return Ok((value, persona));
                }
                Ok(Parsed::Unavailable(reason)) => {
                    log::info!(
                        "{} is unavailable via persona {}: {}",
                        resource,
                        persona.name,
                        reason
                    );
                    unavailable_reason = Some(reason);
                }
                Err(e) if e.is_retryable() => {
                    log::warn!("Persona {} failed for {}: {}", persona.name, resource, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    tracker.fail();
                    return Err(e.with_persona(persona.name));
                }
            }
            tracker.retry();
        }

        match (unavailable_reason, last_error) {
            (Some(reason), _) => {
                tracker.mark_unavailable();
                Err(YouTubeError::unavailable(resource, reason))
            }
            (None, Some(e)) => {
                tracker.fail();
                Err(e)
            }
            (None, None) => {
                tracker.fail();
                Err(YouTubeError::NetworkError(format!(
                    "No persona could resolve {}",
                    resource
                )))
            }
        }
    }
}

impl std::fmt::Debug for InnerTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerTubeClient")
            .field("config", &self.config)
            .finish()
    }
}
