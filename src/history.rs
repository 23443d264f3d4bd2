use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::models::Exchange;
use crate::storage;

// Bounded window of the most recent exchanges, oldest first.
// Rebuilt per request; never stored.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
  pub exchanges: Vec<Exchange>,
}

impl ConversationContext {
  pub fn is_empty(&self) -> bool {
    self.exchanges.is_empty()
  }

  pub fn len(&self) -> usize {
    self.exchanges.len()
  }

  // Two lines per exchange, verbatim text. Only the turn count is
  // bounded, never individual turns.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for exchange in &self.exchanges {
      out.push_str("User: ");
      out.push_str(&exchange.prompt);
      out.push('\n');
      out.push_str("Assistant: ");
      out.push_str(&exchange.response);
      out.push('\n');
    }
    out
  }
}

// The store hands back newest-first; the context wants chronological.
// A read failure is surfaced, never swallowed into an empty window.
pub async fn load_window(
  db: &Mutex<Connection>,
  limit: usize,
) -> Result<ConversationContext, GatewayError> {
  let mut exchanges = storage::list_recent(db, limit)
    .await
    .map_err(|e| GatewayError::Storage(e.to_string()))?;
  exchanges.reverse();
  Ok(ConversationContext { exchanges })
}
