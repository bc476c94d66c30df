//! SQLite-backed named caches.
//!
//! Cache names live in `caches` (creation order is the autoincrement id);
//! responses live in `entries`, keyed by (cache, request key). Deleting a
//! cache cascades to its entries.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::storage::{CacheStorage, ensure_storable};
use crate::{AssetRequest, AssetResponse, Error};

/// An entry flattened into column values, ready to move onto the database thread.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn new(request: &AssetRequest, response: &AssetResponse) -> Result<Self, Error> {
        ensure_storable(request)?;
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        Ok(Self {
            key: request.cache_key(),
            method: request.method.clone(),
            url: request.cache_url(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
        })
    }
}

type RawResponse = (String, u16, String, String, Vec<u8>);

fn decode_response((url, status, status_text, headers_json, body): RawResponse) -> Result<AssetResponse, Error> {
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
    Ok(AssetResponse { url, status, status_text, headers, body: Bytes::from(body) })
}

fn ensure_cache(conn: &Connection, name: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row("SELECT id FROM caches WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}

fn insert_entry(conn: &Connection, cache_id: i64, row: &EntryRow) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            cache_id, key, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(cache_id, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache_id,
            &row.key,
            &row.method,
            &row.url,
            row.status,
            &row.status_text,
            &row.headers_json,
            &row.body[..],
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawResponse> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_cache(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, request: &AssetRequest, response: &AssetResponse) -> Result<(), Error> {
        let name = name.to_string();
        let row = EntryRow::new(request, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let cache_id = ensure_cache(&tx, &name)?;
                insert_entry(&tx, cache_id, &row)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: Vec<(AssetRequest, AssetResponse)>) -> Result<(), Error> {
        let name = name.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let cache_id = ensure_cache(&tx, &name)?;
                for row in &rows {
                    insert_entry(&tx, cache_id, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &AssetRequest) -> Result<Option<AssetResponse>, Error> {
        let name = name.to_string();
        let key = request.cache_key();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawResponse>, Error> {
                let raw = conn
                    .query_row(
                        "SELECT e.url, e.status, e.status_text, e.headers_json, e.body
                        FROM entries e JOIN caches c ON c.id = e.cache_id
                        WHERE c.name = ?1 AND e.key = ?2",
                        params![name, key],
                        read_response,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode_response).transpose()
    }

    async fn match_any(&self, request: &AssetRequest) -> Result<Option<AssetResponse>, Error> {
        let key = request.cache_key();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawResponse>, Error> {
                let raw = conn
                    .query_row(
                        "SELECT e.url, e.status, e.status_text, e.headers_json, e.body
                        FROM entries e JOIN caches c ON c.id = e.cache_id
                        WHERE e.key = ?1
                        ORDER BY c.id ASC LIMIT 1",
                        params![key],
                        read_response,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode_response).transpose()
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url FROM entries e JOIN caches c ON c.id = e.cache_id
                    WHERE c.name = ?1 ORDER BY e.rowid ASC",
                )?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> AssetRequest {
        AssetRequest::get(Url::parse("https://cove.test").unwrap().join(path).unwrap())
    }

    fn response(body: &'static str) -> AssetResponse {
        AssetResponse {
            url: "https://cove.test/".into(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![("content-type".into(), "text/plain".into())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("general", &request("/"), &response("home")).await.unwrap();

        let hit = db.match_in("general", &request("/")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"home"));
        assert_eq!(hit.content_type(), Some("text/plain"));
        assert!(db.match_in("other", &request("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("images", &request("/logo.png"), &response("old")).await.unwrap();
        db.put("images", &request("/logo.png"), &response("new")).await.unwrap();

        let hit = db.match_in("images", &request("/logo.png")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"new"));
        assert_eq!(db.keys("images").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let post = request("/contact").with_method("POST");
        let result = db.put("general", &post, &response("sent")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!db.has("general").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("stale-v1", &request("/"), &response("old home")).await.unwrap();

        assert!(db.delete("stale-v1").await.unwrap());
        assert!(!db.delete("stale-v1").await.unwrap());
        assert!(db.match_any(&request("/")).await.unwrap().is_none());

        let orphans: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_names_creation_order_and_match_any() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("first").await.unwrap();
        db.put("second", &request("/menu"), &response("second")).await.unwrap();
        db.put("first", &request("/menu"), &response("first")).await.unwrap();
        db.open("second").await.unwrap();

        assert_eq!(db.names().await.unwrap(), vec!["first".to_string(), "second".to_string()]);
        let hit = db.match_any(&request("/menu")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn test_put_all_writes_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let batch = vec![(request("/"), response("home")), (request("/src/index.css"), response("css"))];
        db.put_all("general", batch).await.unwrap();

        assert_eq!(
            db.keys("general").await.unwrap(),
            vec!["https://cove.test/".to_string(), "https://cove.test/src/index.css".to_string()]
        );
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let batch = vec![(request("/"), response("home")), (request("/form").with_method("POST"), response("x"))];
        assert!(db.put_all("general", batch).await.is_err());
        assert!(db.keys("general").await.unwrap().is_empty());
    }
}
