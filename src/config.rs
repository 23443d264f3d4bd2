use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PERSONA: &str = "You are a helpful assistant. Do not introduce yourself \
unless the user asks who you are. The conversation so far is included below; use it for \
continuity and refer back to it when the user does.";

#[derive(Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
  pub id: String,
  pub label: String,
  // May be left empty in the file and supplied via <ID>_API_KEY.
  #[serde(default)]
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub vision: bool,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
  pub default_provider: String,
  pub providers: Vec<ProviderConfig>,
  #[serde(default = "default_history_window")]
  pub history_window: usize,
  #[serde(default = "default_persona")]
  pub persona: String,
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
  #[serde(default)]
  pub retry_transient: bool,
}

fn default_history_window() -> usize {
  DEFAULT_HISTORY_WINDOW
}

fn default_persona() -> String {
  DEFAULT_PERSONA.to_string()
}

fn default_timeout_secs() -> u64 {
  DEFAULT_TIMEOUT_SECS
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      default_provider: "openai".to_string(),
      providers: vec![
        ProviderConfig {
          id: "openai".to_string(),
          label: "GPT-4o mini".to_string(),
          api_key: String::new(),
          base_url: "https://api.openai.com/v1".to_string(),
          model: "gpt-4o-mini".to_string(),
          vision: true,
        },
        ProviderConfig {
          id: "openrouter".to_string(),
          label: "Llama 3.1 8B".to_string(),
          api_key: String::new(),
          base_url: "https://openrouter.ai/api/v1".to_string(),
          model: "meta-llama/llama-3.1-8b-instruct".to_string(),
          vision: false,
        },
      ],
      history_window: DEFAULT_HISTORY_WINDOW,
      persona: DEFAULT_PERSONA.to_string(),
      request_timeout_secs: DEFAULT_TIMEOUT_SECS,
      retry_transient: false,
    }
  }
}

impl AppConfig {
  // Fill in keys from the environment so secrets never have to live in the file.
  pub fn apply_env_keys(&mut self) {
    for provider in &mut self.providers {
      if provider.api_key.is_empty() {
        let var = format!("{}_API_KEY", provider.id.to_uppercase());
        if let Ok(key) = std::env::var(&var) {
          provider.api_key = key;
        }
      }
    }
  }
}

pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&data)?;
    Ok(config)
  } else {
    let config = AppConfig::default();
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json)?;
  Ok(())
}
