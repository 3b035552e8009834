//! コメント継続レスポンスのデコード
//!
//! APIの版によって本文の持ち方が2通りある:
//! - (a) `commentRenderer` に本文の runs がそのまま入っている
//! - (b) スレッドには `commentKey` だけがあり、本文は
//!   `frameworkUpdates.entityBatchUpdate.mutations` のエンティティを引いて得る
//!
//! エンティティ表があれば (b) を優先し、無ければ (a) で読む。

use serde_json::Value;
use std::collections::HashMap;

use super::runs::{reconstruct, RunError};
use crate::util::{parse_count_with_suffix, parse_digits};
use crate::youtube::errors::YouTubeError;
use crate::youtube::innertube::reader::Node;
use crate::youtube::types::{Comment, CommandRun, CommentBatch, ContinuationToken};

const MUTATIONS_PATH: &str = "frameworkUpdates.entityBatchUpdate.mutations";

/// コメント欄を示すセクション識別子
pub const COMMENT_SECTION_IDENTIFIER: &str = "comment-item-section";

const CONTINUATION_TOKEN_PATH: &str = "continuationEndpoint.continuationCommand.token";
const BUTTON_TOKEN_PATH: &str = "button.buttonRenderer.command.continuationCommand.token";
const LIKE_LABEL_PATH: &str =
    "actionButtons.commentActionButtonsRenderer.likeButton.toggleButtonRenderer.accessibilityData.accessibilityData.label";

/// `next` レスポンスからコメント欄の最初の継続トークンを探す
///
/// セクションの入れ子の深さはペルソナ・時期によって異なるため、
/// 位置ではなくセクション識別子で探す。コメント欄が無ければ `None`。
pub fn find_initial_token(value: &Value) -> Option<ContinuationToken> {
    Node::root(value)
        .find_all("itemSectionRenderer")
        .into_iter()
        .filter(|section| {
            section.get("sectionIdentifier").and_then(|s| s.as_str())
                == Some(COMMENT_SECTION_IDENTIFIER)
        })
        .find_map(|section| {
            section
                .get("contents")?
                .array()?
                .into_iter()
                .find_map(|item| continuation_token_of(&item))
        })
}

/// `continuationItemRenderer` を含む要素からトークンを取り出す
fn continuation_token_of(item: &Node<'_>) -> Option<ContinuationToken> {
    let renderer = item.get("continuationItemRenderer")?;
    renderer
        .at(CONTINUATION_TOKEN_PATH)
        .or_else(|| renderer.at(BUTTON_TOKEN_PATH))
        .and_then(|t| t.as_str())
        .map(ContinuationToken::new)
}

/// コメント継続レスポンスを1バッチにデコード
pub fn decode_batch(value: &Value) -> Result<CommentBatch, YouTubeError> {
    let root = Node::root(value);
    let entities = entity_map(&root);

    let endpoints = root.require_array("onResponseReceivedEndpoints")?;
    let items: Vec<Node<'_>> = endpoints
        .iter()
        .filter_map(|endpoint| {
            endpoint
                .at("reloadContinuationItemsCommand.continuationItems")
                .or_else(|| endpoint.at("appendContinuationItemsAction.continuationItems"))
        })
        .flat_map(|items| items.array_or_empty())
        .collect();

    let mut comments = Vec::new();
    let mut next_token = None;

    for item in &items {
        if let Some(thread) = item.get("commentThreadRenderer") {
            let mut comment = decode_thread_comment(&thread, entities.as_ref())?;
            comment.replies_token = replies_token(&thread);
            comments.push(comment);
        } else if let Some(view) = item.get("commentViewModel") {
            comments.push(decode_view_model(&view, entities.as_ref())?);
        } else if let Some(renderer) = item.get("commentRenderer") {
            comments.push(decode_renderer(&renderer)?);
        } else if let Some(token) = continuation_token_of(item) {
            next_token = Some(token);
        }
    }

    log::debug!(
        "Decoded {} comments (next token: {})",
        comments.len(),
        next_token.is_some()
    );

    Ok(CommentBatch {
        comments,
        next_token,
    })
}

/// entityKey → commentEntityPayload の表（mutations が無ければ None）
fn entity_map<'a>(root: &Node<'a>) -> Option<HashMap<&'a str, Node<'a>>> {
    let mutations = root.at(MUTATIONS_PATH)?.array()?;
    Some(
        mutations
            .into_iter()
            .filter_map(|mutation| {
                let key = mutation.get("entityKey")?.as_str()?;
                let payload = mutation.at("payload.commentEntityPayload")?;
                Some((key, payload))
            })
            .collect(),
    )
}

fn decode_thread_comment(
    thread: &Node<'_>,
    entities: Option<&HashMap<&str, Node<'_>>>,
) -> Result<Comment, YouTubeError> {
    if entities.is_some() {
        if let Some(view) = thread.at("commentViewModel.commentViewModel") {
            return decode_view_model(&view, entities);
        }
    }
    let renderer = thread.require_at("comment.commentRenderer")?;
    decode_renderer(&renderer)
}

/// 形式(b): commentKey でエンティティを引いて読む
fn decode_view_model(
    view: &Node<'_>,
    entities: Option<&HashMap<&str, Node<'_>>>,
) -> Result<Comment, YouTubeError> {
    let key = view.require_str("commentKey")?;
    let payload = entities
        .and_then(|map| map.get(key))
        .ok_or_else(|| {
            log::error!("Comment entity '{}' is missing from the entity map", key);
            YouTubeError::malformed(format!("{}[entityKey={}]", MUTATIONS_PATH, key))
        })?;

    let properties = payload.require("properties")?;
    let content = properties.require("content")?;
    let text = content.require_str("content")?;
    let runs = command_runs(&content)?;

    let text_segments = reconstruct(text, &runs).map_err(|e| run_error(&content, e))?;

    let like_count = payload
        .at("toolbar.likeCountNotliked")
        .and_then(|n| n.as_str())
        .and_then(|s| parse_count_with_suffix(s))
        .or_else(|| {
            payload
                .at("toolbar.likeCountA11y")
                .and_then(|n| n.as_str())
                .and_then(|s| parse_count_with_suffix(s))
        })
        .unwrap_or(0);

    Ok(Comment {
        id: properties.require_str("commentId")?.to_string(),
        text_segments,
        replies_token: None,
        like_count,
    })
}

/// `commandRuns` を読む（0 の値は省略されることがあるので既定値0）
fn command_runs(content: &Node<'_>) -> Result<Vec<CommandRun>, YouTubeError> {
    let Some(runs) = content.get("commandRuns") else {
        return Ok(Vec::new());
    };
    let runs = runs
        .array()
        .ok_or_else(|| YouTubeError::malformed(runs.path()))?;

    Ok(runs
        .iter()
        .map(|run| {
            let field = |key: &str| {
                run.get(key)
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize)
                    .unwrap_or(0)
            };
            CommandRun::new(field("startIndex"), field("length"))
        })
        .collect())
}

fn run_error(content: &Node<'_>, err: RunError) -> YouTubeError {
    log::error!("Invalid command runs at {}: {}", content.path(), err);
    YouTubeError::malformed(format!("{}.{}", content.path(), err.field_path()))
}

/// 形式(a): 自己完結した renderer を読む
///
/// runs は装飾範囲を持たないので、1つずつ断片化して連結する。
fn decode_renderer(renderer: &Node<'_>) -> Result<Comment, YouTubeError> {
    let id = renderer.require_str("commentId")?;
    let content = renderer.require("contentText")?;

    let mut text_segments = Vec::new();
    if let Some(runs) = content.get("runs").and_then(|r| r.array()) {
        for run in &runs {
            let text = run.get("text").and_then(|t| t.as_str()).unwrap_or_default();
            text_segments.extend(reconstruct(text, &[]).map_err(|e| run_error(run, e))?);
        }
    } else if let Some(text) = content.get("simpleText").and_then(|t| t.as_str()) {
        text_segments = reconstruct(text, &[]).map_err(|e| run_error(&content, e))?;
    }

    let like_count = renderer
        .get("voteCount")
        .and_then(|v| {
            v.get("simpleText")
                .and_then(|t| t.as_str())
                .and_then(parse_count_with_suffix)
        })
        .or_else(|| {
            renderer
                .at(LIKE_LABEL_PATH)
                .and_then(|l| l.as_str())
                .and_then(parse_digits)
        })
        .unwrap_or(0);

    Ok(Comment {
        id: id.to_string(),
        text_segments,
        replies_token: None,
        like_count,
    })
}

fn replies_token(thread: &Node<'_>) -> Option<ContinuationToken> {
    thread
        .at("replies.commentRepliesRenderer.contents")?
        .array()?
        .iter()
        .find_map(continuation_token_of)
}
