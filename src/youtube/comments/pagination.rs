//! 継続トークンによるコメントのページング
//!
//! 1バッチずつ順に取得し、消費されるまで次のバッチは取りに行かない。
//! 件数の上限は設けないが、同じトークンの再発行は無限ループとみなしてエラーにする。

use futures::stream::{self, Stream};
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;

use super::decoder::{decode_batch, find_initial_token};
use crate::youtube::errors::YouTubeError;
use crate::youtube::innertube::persona::{RequestParams, MWEB, WEB};
use crate::youtube::innertube::InnerTubeClient;
use crate::youtube::types::{Comment, CommentBatch, ContinuationToken, VideoId};

impl InnerTubeClient {
    /// 動画のコメント欄の最初の継続トークンを取得（コメント欄が無ければNone）
    pub async fn fetch_initial_token(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> Result<Option<ContinuationToken>, YouTubeError> {
        let request = self.build_request(
            &MWEB,
            &RequestParams::Next {
                video_id: video_id.as_str(),
            },
        )?;
        let value = self.exchange_json(&request, cancel).await?;
        let token = find_initial_token(&value);
        if token.is_none() {
            log::info!("No comment section found for {}", video_id);
        }
        Ok(token)
    }

    /// 継続トークン1つ分のバッチを取得
    pub async fn fetch_batch(
        &self,
        token: &ContinuationToken,
        cancel: &CancellationToken,
    ) -> Result<CommentBatch, YouTubeError> {
        let request = self.build_request(
            &WEB,
            &RequestParams::Continuation {
                token: token.as_str(),
            },
        )?;
        let value = self.exchange_json(&request, cancel).await?;
        decode_batch(&value).map_err(|e| e.with_persona(WEB.name))
    }

    /// 動画のコメントを遅延ストリームとして返す
    ///
    /// エラー（キャンセルを含む）を1度返したらストリームは終了する。
    /// 途中から再開する手段はなく、やり直すには最初のトークンから取り直す。
    pub fn paginate(
        &self,
        video_id: &VideoId,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Comment, YouTubeError>> + '_ {
        Pager::new(self, Step::Initial(video_id.clone()), cancel).into_stream()
    }

    /// 返信の継続トークンから返信を遅延ストリームとして返す
    pub fn paginate_replies(
        &self,
        replies_token: ContinuationToken,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Comment, YouTubeError>> + '_ {
        Pager::new(self, Step::Fetch(replies_token), cancel).into_stream()
    }
}

/// 次に行う取得
#[derive(Debug)]
enum Step {
    Initial(VideoId),
    Fetch(ContinuationToken),
    Done,
}

struct Pager<'a> {
    client: &'a InnerTubeClient,
    cancel: CancellationToken,
    pending: VecDeque<Comment>,
    step: Step,
    seen_tokens: HashSet<String>,
    finished: bool,
}

impl<'a> Pager<'a> {
    fn new(client: &'a InnerTubeClient, step: Step, cancel: CancellationToken) -> Self {
        Self {
            client,
            cancel,
            pending: VecDeque::new(),
            step,
            seen_tokens: HashSet::new(),
            finished: false,
        }
    }

    fn into_stream(self) -> impl Stream<Item = Result<Comment, YouTubeError>> + 'a {
        stream::unfold(self, |mut pager| async move {
            let item = pager.next_item().await?;
            Some((item, pager))
        })
    }

    async fn next_item(&mut self) -> Option<Result<Comment, YouTubeError>> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                return Some(Err(self.abort(YouTubeError::Cancelled)));
            }
            if let Some(comment) = self.pending.pop_front() {
                return Some(Ok(comment));
            }

            match std::mem::replace(&mut self.step, Step::Done) {
                Step::Done => {
                    self.finished = true;
                    return None;
                }
                Step::Initial(video_id) => {
                    match self.client.fetch_initial_token(&video_id, &self.cancel).await {
                        Ok(Some(token)) => self.step = Step::Fetch(token),
                        Ok(None) => self.step = Step::Done,
                        Err(e) => return Some(Err(self.abort(e))),
                    }
                }
                Step::Fetch(token) => {
                    if !self.seen_tokens.insert(token.as_str().to_string()) {
                        log::error!("Continuation token was reissued: {}", token);
                        return Some(Err(self.abort(YouTubeError::malformed(
                            "continuationCommand.token (reissued)",
                        ))));
                    }

                    match self.client.fetch_batch(&token, &self.cancel).await {
                        Ok(batch) => {
                            self.pending.extend(batch.comments);
                            self.step = batch.next_token.map(Step::Fetch).unwrap_or(Step::Done);
                        }
                        Err(e) => return Some(Err(self.abort(e))),
                    }
                }
            }
        }
    }

    /// 取得済みの未消費分を捨てて終了する
    fn abort(&mut self, err: YouTubeError) -> YouTubeError {
        if !matches!(err, YouTubeError::Cancelled) {
            log::warn!("Comment pagination stopped: {}", err);
        }
        self.finished = true;
        self.pending.clear();
        self.step = Step::Done;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::youtube::mock::{Scripted, ScriptedTransport};
    use futures::{StreamExt, TryStreamExt};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn client(transport: &Arc<ScriptedTransport>) -> InnerTubeClient {
        InnerTubeClient::with_transport(transport.clone(), ResolverConfig::without_retry_delay())
    }

    fn video_id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    fn next_response(token: &str) -> Scripted {
        Scripted::json(json!({
            "contents": { "twoColumnWatchNextResults": { "results": { "results": { "contents": [
                { "itemSectionRenderer": {
                    "sectionIdentifier": "comment-item-section",
                    "contents": [ { "continuationItemRenderer": { "continuationEndpoint": {
                        "continuationCommand": { "token": token } } } } ]
                }}
            ]}}}}
        }))
    }

    fn batch(ids: &[&str], next: Option<&str>) -> Scripted {
        let mut items: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({ "commentThreadRenderer": { "comment": { "commentRenderer": {
                    "commentId": id,
                    "contentText": { "runs": [ { "text": format!("text of {}", id) } ] }
                }}}})
            })
            .collect();
        if let Some(token) = next {
            items.push(json!({ "continuationItemRenderer": { "continuationEndpoint": {
                "continuationCommand": { "token": token } } } }));
        }
        Scripted::json(json!({
            "onResponseReceivedEndpoints": [
                { "appendContinuationItemsAction": { "continuationItems": items } }
            ]
        }))
    }

    fn continuation_of(request: &crate::youtube::transport::RequestDescriptor) -> Option<String> {
        request
            .body
            .as_ref()
            .and_then(|b| b.get("continuation"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_paginate_in_strict_order() {
        let transport = Arc::new(ScriptedTransport::new([
            next_response("t1"),
            batch(&["a", "b"], Some("t2")),
            batch(&["c"], Some("t3")),
            batch(&["d"], None),
        ]));
        let client = client(&transport);

        let comments: Vec<Comment> = client
            .paginate(&video_id(), CancellationToken::new())
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(comments[0].text(), "text of a");

        let tokens: Vec<Option<String>> = transport.requests().iter().map(continuation_of).collect();
        assert_eq!(
            tokens,
            vec![None, Some("t1".into()), Some("t2".into()), Some("t3".into())]
        );
        assert!(transport.requests()[0].url.ends_with("/next"));
        // 最初のトークンはモバイル向け、バッチはデスクトップ向けで取得する
        assert_eq!(transport.client_names(), vec!["MWEB", "WEB", "WEB", "WEB"]);
        assert!(transport.requests()[0]
            .header_value("User-Agent")
            .is_some_and(|ua| ua.contains("Android")));
    }

    #[tokio::test]
    async fn test_paginate_is_lazy() {
        let transport = Arc::new(ScriptedTransport::new([
            next_response("t1"),
            batch(&["a", "b"], Some("t2")),
            batch(&["c"], None),
        ]));
        let client = client(&transport);

        let stream = client.paginate(&video_id(), CancellationToken::new());
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap().id, "a");
        assert_eq!(stream.next().await.unwrap().unwrap().id, "b");
        // 2バッチ目は次の要素が要求されるまで取りに行かない
        assert_eq!(transport.request_count(), 2);

        assert_eq!(stream.next().await.unwrap().unwrap().id, "c");
        assert!(stream.next().await.is_none());
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_paginate_without_comment_section() {
        let transport = Arc::new(ScriptedTransport::new([Scripted::json(json!({ "contents": {} }))]));
        let client = client(&transport);

        let comments: Vec<Comment> = client
            .paginate(&video_id(), CancellationToken::new())
            .try_collect()
            .await
            .unwrap();

        assert!(comments.is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_reissued_token_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new([
            next_response("t1"),
            batch(&["a"], Some("t2")),
            batch(&["b"], Some("t1")),
        ]));
        let client = client(&transport);

        let results: Vec<Result<Comment, YouTubeError>> = client
            .paginate(&video_id(), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(YouTubeError::MalformedResponse { .. })));
        // t1 は再送しない
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_during_exchange_discards_batch() {
        let transport = Arc::new(ScriptedTransport::new([next_response("t1"), Scripted::Hang]));
        let client = client(&transport);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let results: Vec<Result<Comment, YouTubeError>> =
            client.paginate(&video_id(), cancel).collect().await;
        canceller.await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(YouTubeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_between_items_stops_stream() {
        let transport = Arc::new(ScriptedTransport::new([
            next_response("t1"),
            batch(&["a", "b", "c"], Some("t2")),
        ]));
        let client = client(&transport);
        let cancel = CancellationToken::new();

        let stream = client.paginate(&video_id(), cancel.clone());
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap().id, "a");
        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(YouTubeError::Cancelled))));
        assert!(stream.next().await.is_none());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let transport = Arc::new(ScriptedTransport::new([
            next_response("t1"),
            Scripted::Network("connection reset".into()),
        ]));
        let client = client(&transport);

        let results: Vec<Result<Comment, YouTubeError>> = client
            .paginate(&video_id(), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(YouTubeError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_paginate_replies() {
        let transport = Arc::new(ScriptedTransport::new([
            batch(&["r1"], Some("r-2")),
            batch(&["r2"], None),
        ]));
        let client = client(&transport);

        let replies: Vec<Comment> = client
            .paginate_replies(ContinuationToken::new("r-1"), CancellationToken::new())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(transport.client_names(), vec!["WEB", "WEB"]);
        assert_eq!(continuation_of(&transport.requests()[0]).as_deref(), Some("r-1"));
    }
}
