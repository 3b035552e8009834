//! YouTube の InnerTube API から動画・チャンネル情報を解決し、
//! コメントを継続トークンで順に取得するライブラリ。
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use innertube_harvest::{InnerTubeClient, ResolverConfig};
//! use innertube_harvest::youtube::types::VideoId;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), innertube_harvest::YouTubeError> {
//! let client = InnerTubeClient::new(ResolverConfig::default())?;
//! let video_id = VideoId::parse("https://youtu.be/dQw4w9WgXcQ")?;
//!
//! let player = client.resolve_player_metadata(&video_id).await?;
//! println!("{} by {}", player.payload.title, player.payload.author);
//!
//! let comments: Vec<_> = client
//!     .paginate(&video_id, CancellationToken::new())
//!     .try_collect()
//!     .await?;
//! println!("{} comments", comments.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod util; // doctestのためpubにする
pub mod youtube;

pub use config::ResolverConfig;
pub use youtube::{InnerTubeClient, YouTubeError};
