//! InnerTube API クライアントモジュール
//!
//! YouTubeの内部APIを使用して動画・チャンネルの情報を解決する。
//! 公式API Data v3と異なり、APIキー不要でクォータ制限なし。
//!
//! ## 注意事項
//! - 非公式APIのため、レスポンスの形は予告なく変わる
//! - 必須フィールドの欠落は `MalformedResponse` としてパス付きで報告する

pub mod client;
pub mod parser;
pub mod persona;
pub mod reader;

pub use client::InnerTubeClient;
pub use parser::Parsed;
pub use persona::{ClientPersona, RequestBuilder, RequestParams};
pub use reader::{FieldMissing, Node};
