// =============================================================================
// コメント取得モジュール
// =============================================================================
// 継続トークンで動画のコメント（と返信）を1バッチずつ取得する
//
// 機能:
// - コメント欄の最初の継続トークンの探索
// - 2通りのレスポンス形式（renderer / エンティティ表）のデコード
// - 本文とコマンド範囲からのテキスト断片化
// =============================================================================

pub mod decoder;
mod pagination;
pub mod runs;

pub use decoder::{decode_batch, find_initial_token};
pub use runs::{reconstruct, RunError};
