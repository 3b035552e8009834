use thiserror::Error;

#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to fetch '{resource}' after {attempts} attempts - please try again in a few minutes")]
    TransientFetchFailure { resource: String, attempts: u32 },

    #[error("Resource '{id}' is not available: {reason}")]
    ResourceUnavailable { id: String, reason: String },

    #[error("Malformed response{}: missing or invalid '{field_path}'", persona_suffix(.persona))]
    MalformedResponse {
        field_path: String,
        persona: Option<&'static str>,
    },

    #[error("Persona '{persona}' does not support parameter '{parameter}'")]
    UnsupportedParameter {
        persona: &'static str,
        parameter: &'static str,
    },

    #[error("Invalid {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Operation was cancelled")]
    Cancelled,
}

fn persona_suffix(persona: &Option<&'static str>) -> String {
    persona
        .map(|p| format!(" from persona '{}'", p))
        .unwrap_or_default()
}

impl YouTubeError {
    /// フィールドパスからMalformedResponseを作成
    pub fn malformed(field_path: impl Into<String>) -> Self {
        YouTubeError::MalformedResponse {
            field_path: field_path.into(),
            persona: None,
        }
    }

    pub fn unavailable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        YouTubeError::ResourceUnavailable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// MalformedResponseにペルソナ名を付与（他のエラーはそのまま）
    pub fn with_persona(self, name: &'static str) -> Self {
        match self {
            YouTubeError::MalformedResponse { field_path, .. } => YouTubeError::MalformedResponse {
                field_path,
                persona: Some(name),
            },
            other => other,
        }
    }

    /// 同じ操作を再試行して回復し得るエラーかどうか
    ///
    /// ネットワーク層の失敗のみ。応答の形が壊れている・リソースが無い等は対象外。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            YouTubeError::HttpError(_) | YouTubeError::NetworkError(_)
        )
    }
}

impl From<YouTubeError> for String {
    fn from(err: YouTubeError) -> String {
        err.to_string()
    }
}
