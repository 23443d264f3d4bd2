use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
  UnsupportedModality,
  Transport,
  RateLimited,
  InvalidResponse,
}

impl fmt::Display for ProviderErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      ProviderErrorKind::UnsupportedModality => "unsupported modality",
      ProviderErrorKind::Transport => "transport failure",
      ProviderErrorKind::RateLimited => "rate limited",
      ProviderErrorKind::InvalidResponse => "invalid response",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("prompt is required")]
  EmptyPrompt,
  #[error("image could not be decoded: {0}")]
  ImageDecode(String),
  #[error("unknown provider: {0}")]
  UnknownProvider(String),
  #[error("provider error ({kind}): {detail}")]
  Provider {
    kind: ProviderErrorKind,
    detail: String,
  },
  #[error("history store error: {0}")]
  Storage(String),
  #[error("answer produced but history was not saved: {detail}")]
  RecordingFailed { response: String, detail: String },
  #[error("internal error: {0}")]
  Internal(String),
}

impl GatewayError {
  pub fn status(&self) -> StatusCode {
    match self {
      GatewayError::EmptyPrompt
      | GatewayError::ImageDecode(_)
      | GatewayError::UnknownProvider(_) => StatusCode::BAD_REQUEST,
      GatewayError::Provider { .. }
      | GatewayError::Storage(_)
      | GatewayError::RecordingFailed { .. }
      | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  // Only network-level and rate-limit failures are safe to retry.
  pub fn transient(&self) -> bool {
    matches!(
      self,
      GatewayError::Provider {
        kind: ProviderErrorKind::Transport | ProviderErrorKind::RateLimited,
        ..
      }
    )
  }
}

impl IntoResponse for GatewayError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      // The answer exists even though persistence failed; hand it to the
      // caller alongside the error so it is not lost.
      GatewayError::RecordingFailed { response, .. } => {
        serde_json::json!({ "error": self.to_string(), "response": response })
      }
      _ => serde_json::json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
