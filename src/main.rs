mod config;
mod error;
mod history;
mod image;
mod logger;
mod models;
mod prompt;
mod provider;
mod router;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use config::load_or_init;
use logger::Logger;
use provider::Dispatcher;
use router::{run_router, RouterState};
use storage::init_db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let data_dir = std::env::var("CHATGATE_DATA_DIR")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("data"));
  std::fs::create_dir_all(&data_dir)?;

  let config_path = data_dir.join("config.json");
  let db_path = data_dir.join("chatgate.sqlite3");
  let log_path = data_dir.join("chatgate.log");

  let mut config = load_or_init(&config_path)?;
  config.apply_env_keys();

  let db = Arc::new(tokio::sync::Mutex::new(init_db(&db_path)?));
  let logger = Arc::new(Logger::new(&log_path)?);

  let addr = std::env::var("CHATGATE_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
  let listener = std::net::TcpListener::bind(&addr)?;
  listener.set_nonblocking(true)?;
  logger.info(&format!("chatgate listening on {}", listener.local_addr()?));

  let dispatcher = Dispatcher::new(&config)?;
  let state = RouterState {
    started_at: Instant::now(),
    config,
    db,
    dispatcher,
    logger,
  };
  run_router(listener, state).await
}
