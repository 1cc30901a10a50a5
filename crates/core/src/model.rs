//! Request identity and stored response snapshots.

use crate::cache::hash::compute_cache_key;

/// Identity of a cached request: method plus full URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// Key for a GET request, the only method that is ever cached.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Content-addressed hash used as the storage key.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

/// A stored response snapshot.
///
/// Holds everything needed to replay the response byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of when the snapshot was written.
    pub stored_at: String,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers, body: body.into(), stored_at: chrono::Utc::now().to_rfc3339() }
    }
}
