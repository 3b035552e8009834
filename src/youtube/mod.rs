pub mod backoff;
pub mod comments;
pub mod errors;
pub mod innertube;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use errors::YouTubeError;
pub use innertube::InnerTubeClient;
pub use transport::{ReqwestTransport, RequestDescriptor, Transport};
