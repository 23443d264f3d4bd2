use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::history;
use crate::image;
use crate::logger::Logger;
use crate::models::{ChatRequest, ChatResponse, HistoryItem};
use crate::prompt;
use crate::provider::Dispatcher;
use crate::storage;

pub struct RouterState {
  pub started_at: Instant,
  pub config: AppConfig,
  pub db: Arc<Mutex<Connection>>,
  pub dispatcher: Dispatcher,
  pub logger: Arc<Logger>,
}

pub async fn run_router(listener: TcpListener, state: RouterState) -> anyhow::Result<()> {
  let app = Router::new()
    .route("/health", get(health))
    .route("/v1/chat", post(chat))
    .route("/v1/history", get(list_history))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state));

  let listener = tokio::net::TcpListener::from_std(listener)?;
  axum::serve(listener, app).await?;
  Ok(())
}

async fn health(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  let uptime = state.started_at.elapsed().as_millis();
  Json(serde_json::json!({
    "status": "ok",
    "uptime_ms": uptime
  }))
}

async fn chat(State(state): State<Arc<RouterState>>, Json(req): Json<ChatRequest>) -> Response {
  match handle_chat(&state, req).await {
    Ok(text) => {
      state.logger.info("chat request completed");
      (StatusCode::OK, Json(ChatResponse { response: text })).into_response()
    }
    Err(err) => {
      state.logger.error(&format!("chat request failed: {err}"));
      err.into_response()
    }
  }
}

// The per-request pipeline: validate, normalize, load history, assemble,
// dispatch, record. A failure at any stage before dispatch leaves the
// store untouched.
async fn handle_chat(state: &RouterState, req: ChatRequest) -> Result<String, GatewayError> {
  // Prompt validation comes before any image or network work.
  let prompt = req
    .prompt
    .as_deref()
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .ok_or(GatewayError::EmptyPrompt)?
    .to_string();

  let normalized = match req.image {
    Some(img) => {
      let bytes = base64::engine::general_purpose::STANDARD
        .decode(img.base64.as_bytes())
        .map_err(|e| GatewayError::ImageDecode(e.to_string()))?;
      // CPU-bound; keep it off the I/O threads.
      let normalized = tokio::task::spawn_blocking(move || image::normalize(&bytes))
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))??;
      Some(normalized)
    }
    None => None,
  };

  let context = history::load_window(&state.db, state.config.history_window).await?;
  let message = prompt::assemble(
    &state.config.persona,
    Some(prompt.as_str()),
    normalized.clone(),
    &context,
  )?;

  let provider_id = resolve_provider(
    req.provider_override.as_deref(),
    &state.config.default_provider,
  );
  let reply = state.dispatcher.dispatch(&message, provider_id).await?;
  state.logger.info(&format!(
    "provider {provider_id} answered with upstream status {}",
    reply.raw_status
  ));

  match storage::create(&state.db, &prompt, normalized.as_ref(), &reply.text, req.source).await {
    Ok(_) => Ok(reply.text),
    Err(e) => Err(GatewayError::RecordingFailed {
      response: reply.text,
      detail: e.to_string(),
    }),
  }
}

fn resolve_provider<'a>(requested: Option<&'a str>, default: &'a str) -> &'a str {
  match requested {
    Some(id) if !id.trim().is_empty() => id,
    _ => default,
  }
}

async fn list_history(State(state): State<Arc<RouterState>>) -> Response {
  match storage::list_all(&state.db).await {
    Ok(exchanges) => {
      let items: Vec<HistoryItem> = exchanges
        .into_iter()
        .map(|exchange| exchange.into_history_item())
        .collect();
      (StatusCode::OK, Json(items)).into_response()
    }
    Err(err) => {
      state.logger.error(&format!("history listing failed: {err}"));
      GatewayError::Storage(err.to_string()).into_response()
    }
  }
}
