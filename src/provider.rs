use std::time::Duration;

use serde::Serialize;

use crate::config::{AppConfig, ProviderConfig};
use crate::error::{GatewayError, ProviderErrorKind};
use crate::prompt::{AssembledMessage, TurnContent};

// Total attempts when transient retry is enabled.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug)]
pub struct ProviderResponse {
  pub text: String,
  pub raw_status: u16,
}

#[derive(Serialize)]
struct WireMessage {
  role: String,
  content: serde_json::Value,
}

#[derive(Serialize)]
struct WireChatRequest {
  model: String,
  messages: Vec<WireMessage>,
}

// Maps assembled messages onto a concrete provider's chat-completions
// wire shape and issues the call. Built once from config at startup;
// holds no process-global state.
pub struct Dispatcher {
  client: reqwest::Client,
  providers: Vec<ProviderConfig>,
  retry_transient: bool,
}

impl Dispatcher {
  pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()?;
    Ok(Self {
      client,
      providers: config.providers.clone(),
      retry_transient: config.retry_transient,
    })
  }

  pub fn provider(&self, id: &str) -> Result<&ProviderConfig, GatewayError> {
    self
      .providers
      .iter()
      .find(|p| p.id == id)
      .ok_or_else(|| GatewayError::UnknownProvider(id.to_string()))
  }

  pub async fn dispatch(
    &self,
    message: &AssembledMessage,
    provider_id: &str,
  ) -> Result<ProviderResponse, GatewayError> {
    let provider = self.provider(provider_id)?;

    // Fail closed: never silently drop the image or switch providers.
    if message.has_image() && !provider.vision {
      return Err(GatewayError::Provider {
        kind: ProviderErrorKind::UnsupportedModality,
        detail: format!("provider {} does not accept image input", provider.id),
      });
    }

    let payload = to_wire(provider, message);
    let mut remaining = if self.retry_transient { MAX_ATTEMPTS } else { 1 };
    loop {
      remaining -= 1;
      match self.send(provider, &payload).await {
        Ok(response) => return Ok(response),
        Err(err) if remaining > 0 && err.transient() => continue,
        Err(err) => return Err(err),
      }
    }
  }

  async fn send(
    &self,
    provider: &ProviderConfig,
    payload: &WireChatRequest,
  ) -> Result<ProviderResponse, GatewayError> {
    let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
    let resp = self
      .client
      .post(&url)
      .bearer_auth(&provider.api_key)
      .json(payload)
      .send()
      .await
      .map_err(|e| GatewayError::Provider {
        kind: ProviderErrorKind::Transport,
        detail: e.to_string(),
      })?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
      let body = resp.text().await.unwrap_or_default();
      return Err(GatewayError::Provider {
        kind: ProviderErrorKind::RateLimited,
        detail: format!("upstream {status}: {body}"),
      });
    }
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(GatewayError::Provider {
        kind: ProviderErrorKind::Transport,
        detail: format!("upstream {status}: {body}"),
      });
    }

    let raw_status = status.as_u16();
    let body: serde_json::Value = resp.json().await.map_err(|e| GatewayError::Provider {
      kind: ProviderErrorKind::InvalidResponse,
      detail: e.to_string(),
    })?;
    let text = extract_text(&body)?;
    Ok(ProviderResponse { text, raw_status })
  }
}

fn to_wire(provider: &ProviderConfig, message: &AssembledMessage) -> WireChatRequest {
  let mut messages = vec![WireMessage {
    role: "system".to_string(),
    content: serde_json::json!(message.system_text),
  }];

  for turn in &message.turns {
    let content = match &turn.content {
      TurnContent::Text(text) => serde_json::json!(text),
      TurnContent::TextWithImage { text, image } => serde_json::json!([
        { "type": "text", "text": text },
        { "type": "image_url", "image_url": { "url": image.to_data_uri(), "detail": "high" } }
      ]),
    };
    messages.push(WireMessage {
      role: turn.role.as_str().to_string(),
      content,
    });
  }

  WireChatRequest {
    model: provider.model.clone(),
    messages,
  }
}

// Exactly the first completion's text; anything else is malformed.
fn extract_text(body: &serde_json::Value) -> Result<String, GatewayError> {
  body["choices"][0]["message"]["content"]
    .as_str()
    .map(|s| s.to_string())
    .ok_or_else(|| GatewayError::Provider {
      kind: ProviderErrorKind::InvalidResponse,
      detail: "no completion in response body".to_string(),
    })
}
