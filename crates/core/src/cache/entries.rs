//! Stored responses and entry operations.
//!
//! Entries are keyed by method and URL within a named store. When the
//! stored response carries a `Vary` header, the request headers it names are
//! recorded and a later lookup only matches if its own values agree.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response as held by the cache: status, headers, body bytes.
///
/// The body is reference-counted, so cloning a response to hand one copy to
/// the caller and another to a background store write does not copy bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Only a plain 200 is eligible for storing after a fetch.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lowercased header names listed in `Vary`.
    fn vary_names(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
            .flat_map(|(_, v)| v.split(','))
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Listing metadata for one entry (no body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntryMeta {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub stored_at: String,
}

fn request_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Snapshot of the request values for each varied header. `*` is kept as a
/// key with no value and never matches.
fn vary_snapshot(
    response: &StoredResponse, request_headers: &[(String, String)],
) -> Option<BTreeMap<String, Option<String>>> {
    let names = response.vary_names();
    if names.is_empty() {
        return None;
    }
    Some(
        names
            .into_iter()
            .map(|name| {
                let value = request_header(request_headers, &name).map(str::to_string);
                (name, value)
            })
            .collect(),
    )
}

fn vary_matches(stored: &BTreeMap<String, Option<String>>, request_headers: &[(String, String)]) -> bool {
    stored.iter().all(|(name, value)| {
        name != "*" && request_header(request_headers, name) == value.as_deref()
    })
}

/// One entry serialized for insertion.
struct EntryRow {
    key_hash: String,
    url: String,
    vary_json: Option<String>,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(url: &str, request_headers: &[(String, String)], response: &StoredResponse) -> Result<Self, Error> {
        let vary_json = vary_snapshot(response, request_headers)
            .map(|v| serde_json::to_string(&v))
            .transpose()?;
        Ok(Self {
            key_hash: compute_cache_key("GET", url),
            url: url.to_string(),
            vary_json,
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }

    /// Upsert into `store`, so concurrent writes resolve last-writer-wins.
    fn write(&self, conn: &rusqlite::Connection, store: &str, now: &str) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO cache_entries (
                cache_name, key_hash, method, url, vary_json,
                status_code, headers_json, body, stored_at
            ) VALUES (?1, ?2, 'GET', ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                url = excluded.url,
                vary_json = excluded.vary_json,
                status_code = excluded.status_code,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![store, self.key_hash, self.url, self.vary_json, self.status, self.headers_json, self.body, now],
        )?;
        Ok(())
    }
}

fn store_exists(conn: &rusqlite::Connection, store: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)", params![store], |row| row.get(0))
}

impl CacheDb {
    /// Store a response for a GET request in an existing store.
    ///
    /// Overwrites any entry with the same key. Returns false, writing
    /// nothing, when the store does not exist (never opened, or deleted by
    /// the activation of a newer version).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for any method other than GET.
    pub async fn put_entry(
        &self, store: &str, method: &str, url: &str, request_headers: &[(String, String)],
        response: &StoredResponse,
    ) -> Result<bool, Error> {
        if !method.eq_ignore_ascii_case("GET") {
            return Err(Error::InvalidInput(format!("only GET responses are cached, got {method}")));
        }

        let store = store.to_string();
        let row = EntryRow::new(url, request_headers, response)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                if !store_exists(&tx, &store)? {
                    return Ok(false);
                }
                row.write(&tx, &store, &now)?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// Create the store if needed and write every GET entry in one
    /// transaction. Either all entries land or none do, and a store that did
    /// not exist before is not left behind on failure.
    pub async fn install_entries(&self, store: &str, entries: &[(String, StoredResponse)]) -> Result<usize, Error> {
        let store = store.to_string();
        let rows = entries
            .iter()
            .map(|(url, response)| EntryRow::new(url, &[], response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                for row in &rows {
                    row.write(&tx, &store, &now)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in the named store.
    ///
    /// Returns None if there is no entry for the key, or if the stored
    /// `Vary` headers disagree with `request_headers`.
    pub async fn match_entry(
        &self, store: &str, method: &str, url: &str, request_headers: &[(String, String)],
    ) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key_hash = compute_cache_key(method, url);

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(Option<String>, u16, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT vary_json, status_code, headers_json, body
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((vary_json, status, headers_json, body)) = row else {
            return Ok(None);
        };

        if let Some(vary_json) = vary_json {
            let stored: BTreeMap<String, Option<String>> = serde_json::from_str(&vary_json)?;
            if !vary_matches(&stored, request_headers) {
                tracing::debug!(url, "cache entry present but Vary headers differ");
                return Ok(None);
            }
        }

        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(Some(StoredResponse::new(status, headers, body)))
    }

    /// List entries of the named store, oldest first.
    pub async fn entry_keys(&self, store: &str) -> Result<Vec<CacheEntryMeta>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status_code, stored_at FROM cache_entries
                     WHERE cache_name = ?1 ORDER BY stored_at ASC, url ASC",
                )?;
                let entries = stmt
                    .query_map(params![store], |row| {
                        Ok(CacheEntryMeta {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status_code: row.get(2)?,
                            stored_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries across all stores.
    pub async fn total_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries of the named store whose URL contains `pattern`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_by_url(&self, store: &str, pattern: &str) -> Result<u64, Error> {
        let store = store.to_string();
        let pattern = format!("%{pattern}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND url LIKE ?2",
                    params![store, pattern],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
