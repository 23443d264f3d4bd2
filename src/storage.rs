use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::image::NormalizedImage;
use crate::models::{Exchange, Source, StoredImage};

pub fn init_db(path: &Path) -> anyhow::Result<Connection> {
  let conn = Connection::open(path)?;
  apply_schema(&conn)?;
  Ok(conn)
}

pub fn apply_schema(conn: &Connection) -> anyhow::Result<()> {
  conn.execute_batch(
    "
    CREATE TABLE IF NOT EXISTS exchanges (
      id TEXT PRIMARY KEY,
      created_at TEXT NOT NULL,
      prompt TEXT NOT NULL,
      image BLOB,
      image_mime TEXT,
      response TEXT NOT NULL,
      source TEXT NOT NULL
    );
    ",
  )?;
  Ok(())
}

pub async fn create(
  db: &Mutex<Connection>,
  prompt: &str,
  image: Option<&NormalizedImage>,
  response: &str,
  source: Source,
) -> anyhow::Result<Exchange> {
  let id = uuid::Uuid::new_v4().to_string();
  let created_at = Utc::now().to_rfc3339();
  let image_bytes = image.map(|img| img.bytes.clone());
  let image_mime = image.map(|img| img.mime.clone());

  let conn = db.lock().await;
  conn.execute(
    "INSERT INTO exchanges (id, created_at, prompt, image, image_mime, response, source)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      id,
      created_at,
      prompt,
      image_bytes,
      image_mime,
      response,
      source.as_str()
    ],
  )?;

  Ok(Exchange {
    id,
    prompt: prompt.to_string(),
    image: image.map(|img| StoredImage {
      bytes: img.bytes.clone(),
      mime: img.mime.clone(),
    }),
    response: response.to_string(),
    source,
    created_at,
  })
}

// Newest first. Rowid breaks ties between rows created in the same instant.
pub async fn list_recent(db: &Mutex<Connection>, limit: usize) -> anyhow::Result<Vec<Exchange>> {
  let conn = db.lock().await;
  let mut stmt = conn.prepare(
    "SELECT id, created_at, prompt, image, image_mime, response, source
     FROM exchanges ORDER BY created_at DESC, rowid DESC LIMIT ?1",
  )?;
  let rows = stmt.query_map(params![limit as i64], row_to_exchange)?;
  collect_rows(rows)
}

pub async fn list_all(db: &Mutex<Connection>) -> anyhow::Result<Vec<Exchange>> {
  let conn = db.lock().await;
  let mut stmt = conn.prepare(
    "SELECT id, created_at, prompt, image, image_mime, response, source
     FROM exchanges ORDER BY created_at DESC, rowid DESC",
  )?;
  let rows = stmt.query_map([], row_to_exchange)?;
  collect_rows(rows)
}

fn row_to_exchange(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
  let image_bytes: Option<Vec<u8>> = row.get(3)?;
  let image_mime: Option<String> = row.get(4)?;
  let image = match (image_bytes, image_mime) {
    (Some(bytes), Some(mime)) => Some(StoredImage { bytes, mime }),
    _ => None,
  };
  let source: String = row.get(6)?;
  Ok(Exchange {
    id: row.get(0)?,
    created_at: row.get(1)?,
    prompt: row.get(2)?,
    image,
    response: row.get(5)?,
    source: Source::from_str(&source),
  })
}

fn collect_rows(
  rows: impl Iterator<Item = rusqlite::Result<Exchange>>,
) -> anyhow::Result<Vec<Exchange>> {
  let mut exchanges = Vec::new();
  for row in rows {
    exchanges.push(row?);
  }
  Ok(exchanges)
}

#[cfg(test)]
pub fn test_db() -> Mutex<Connection> {
  let conn = Connection::open_in_memory().unwrap();
  apply_schema(&conn).unwrap();
  Mutex::new(conn)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::image::JPEG_MIME;

  #[tokio::test]
  async fn list_recent_returns_newest_first_and_bounds_count() {
    let db = test_db();
    for i in 0..4 {
      create(&db, &format!("p{i}"), None, &format!("r{i}"), Source::Other)
        .await
        .unwrap();
    }

    let recent = list_recent(&db, 3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].prompt, "p3");
    assert_eq!(recent[2].prompt, "p1");
  }

  #[tokio::test]
  async fn create_persists_image_blob_and_mime() {
    let db = test_db();
    let image = NormalizedImage {
      bytes: vec![0xFF, 0xD8, 0xFF],
      mime: JPEG_MIME.to_string(),
      quality: 85,
    };
    let created = create(&db, "what is this", Some(&image), "a cat", Source::Mobile)
      .await
      .unwrap();
    assert!(!created.id.is_empty());

    let all = list_all(&db).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, created.id);
    let stored = all[0].image.as_ref().expect("image stored");
    assert_eq!(stored.bytes, vec![0xFF, 0xD8, 0xFF]);
    assert_eq!(stored.mime, JPEG_MIME);
    assert_eq!(all[0].source, Source::Mobile);
  }

  #[tokio::test]
  async fn empty_store_lists_nothing() {
    let db = test_db();
    assert!(list_recent(&db, 10).await.unwrap().is_empty());
    assert!(list_all(&db).await.unwrap().is_empty());
  }
}
