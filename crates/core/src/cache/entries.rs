//! Cache entry operations.
//!
//! Each entry maps a request identity to a stored response snapshot within
//! one generation. Writes are single UPSERT statements, so readers never see
//! a partially written entry.

use super::connection::CacheDb;
use crate::Error;
use crate::model::{CacheKey, StoredResponse};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

type EntryRow = (i64, String, Vec<u8>, String);

fn decode_row(row: EntryRow) -> Result<StoredResponse, Error> {
    let (status, headers_json, body, stored_at) = row;
    let status = u16::try_from(status).map_err(|_| Error::Serialization(format!("invalid status {status}")))?;
    let headers = serde_json::from_str(&headers_json)?;
    Ok(StoredResponse { status, headers, body, stored_at })
}

impl CacheDb {
    /// Insert or replace the entry for `key` in `generation`.
    ///
    /// The generation is created if it doesn't exist yet.
    pub async fn upsert_entry(&self, generation: &str, key: &CacheKey, response: &StoredResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        let key_hash = key.hash();
        let key = key.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![&generation, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.execute(
                    "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &generation,
                        &key_hash,
                        &key.method,
                        &key.url,
                        response.status as i64,
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key`.
    ///
    /// With `generation` set, only that generation is searched. Without it,
    /// every generation is searched and the most recently stored entry wins.
    pub async fn get_entry(&self, key: &CacheKey, generation: Option<&str>) -> Result<Option<StoredResponse>, Error> {
        let key_hash = key.hash();
        let generation = generation.map(str::to_string);

        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result: rusqlite::Result<EntryRow> = match &generation {
                    Some(name) => conn.query_row(
                        "SELECT status, headers_json, body, stored_at FROM entries
                        WHERE generation = ?1 AND key_hash = ?2",
                        params![name, key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    ),
                    None => conn.query_row(
                        "SELECT status, headers_json, body, stored_at FROM entries
                        WHERE key_hash = ?1 ORDER BY stored_at DESC LIMIT 1",
                        params![key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    ),
                };

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_row).transpose()
    }

    /// List the request identities stored in a generation.
    pub async fn list_keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| Ok(CacheKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
