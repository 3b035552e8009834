//! テスト用の台本付きトランスポート

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::errors::YouTubeError;
use super::transport::{RequestDescriptor, Transport};

/// 1回分の応答
#[derive(Debug, Clone)]
pub enum Scripted {
    Body(String),
    Network(String),
    /// キャンセルされるまで応答しない
    Hang,
}

impl Scripted {
    pub fn json(value: Value) -> Self {
        Scripted::Body(value.to_string())
    }
}

/// 台本どおりに応答し、受け取ったリクエストを記録する
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// 各リクエストの context.client.clientName
    pub fn client_names(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| {
                r.body
                    .as_ref()
                    .and_then(|b| b.pointer("/context/client/clientName"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, YouTubeError> {
        if cancel.is_cancelled() {
            return Err(YouTubeError::Cancelled);
        }
        self.requests.lock().unwrap().push(request.clone());

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Body(body)) => Ok(body.into_bytes()),
            Some(Scripted::Network(message)) => Err(YouTubeError::NetworkError(message)),
            Some(Scripted::Hang) => {
                cancel.cancelled().await;
                Err(YouTubeError::Cancelled)
            }
            None => Err(YouTubeError::NetworkError(format!(
                "no scripted response for {}",
                request.url
            ))),
        }
    }
}
