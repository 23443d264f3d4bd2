use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct ImageData {
  pub mime: String,
  pub base64: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Desktop,
  Mobile,
  #[default]
  Other,
}

impl Source {
  pub fn as_str(&self) -> &'static str {
    match self {
      Source::Desktop => "desktop",
      Source::Mobile => "mobile",
      Source::Other => "other",
    }
  }

  pub fn from_str(value: &str) -> Self {
    match value {
      "desktop" => Source::Desktop,
      "mobile" => Source::Mobile,
      _ => Source::Other,
    }
  }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ChatRequest {
  pub prompt: Option<String>,
  pub image: Option<ImageData>,
  #[serde(default)]
  pub source: Source,
  pub provider_override: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
  pub response: String,
}

// Normalized image bytes persisted alongside the exchange.
#[derive(Debug, Clone)]
pub struct StoredImage {
  pub bytes: Vec<u8>,
  pub mime: String,
}

// One persisted prompt/response pair. Immutable once created.
#[derive(Debug, Clone)]
pub struct Exchange {
  pub id: String,
  pub prompt: String,
  pub image: Option<StoredImage>,
  pub response: String,
  pub source: Source,
  pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct HistoryItem {
  pub prompt: String,
  pub response: String,
  pub source: Source,
  pub timestamp: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
}

impl Exchange {
  pub fn into_history_item(self) -> HistoryItem {
    let image_url = self.image.map(|img| {
      let encoded = base64::engine::general_purpose::STANDARD.encode(&img.bytes);
      format!("data:{};base64,{}", img.mime, encoded)
    });
    HistoryItem {
      prompt: self.prompt,
      response: self.response,
      source: self.source,
      timestamp: self.created_at,
      image_url,
    }
  }
}
