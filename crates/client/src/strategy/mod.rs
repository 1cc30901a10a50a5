//! Retrieval strategies.
//!
//! - **Cache-first**: serve the stored copy and revalidate it in a detached
//!   task; go to the network only on a miss.
//! - **Network-first**: serve the live response and keep a copy; on network
//!   loss serve the stored copy, or a synthesized 503 when there is none.
//!
//! Only storable responses are ever written: 2xx other than 206, not marked
//! `no-store` or `private`, and not answering a request that carried
//! credentials. Writes overwrite the entry for the
//! request, so concurrent revalidations converge on the newest response.

pub mod fallback;

use std::sync::Arc;

use tokio::task::JoinHandle;
use waypost_core::{CacheKey, CacheStore, Error, GenerationName, StoredResponse};

use crate::fetch::{NetworkClient, ProxyRequest, ProxyResponse};

pub use fallback::{Fallback, OFFLINE_CONTENT_TYPE, offline_response};

/// The injected cache store and network capabilities.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn NetworkClient>,
}

impl Backends {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn NetworkClient>) -> Self {
        Self { store, network }
    }
}

/// Serve from `generation` if present, otherwise fetch and store.
///
/// # Errors
///
/// Returns the network error when the entry is missing and the fetch fails.
pub async fn cache_first(
    backends: &Backends, request: &ProxyRequest, generation: &GenerationName,
) -> Result<ProxyResponse, Error> {
    let key = request.cache_key();

    if let Some(stored) = lookup(backends, &key, generation).await {
        tracing::debug!(url = %request.url, %generation, "cache hit");
        spawn_revalidation(backends.clone(), request.clone(), generation.clone());
        return Ok(ProxyResponse::from_stored(stored));
    }

    tracing::debug!(url = %request.url, %generation, "cache miss");
    let response = backends.network.fetch(request).await?;
    if storable(request, &response) {
        store(backends, generation, &key, &response.to_stored()).await;
    }
    Ok(response)
}

/// Serve from the network and keep a copy; fall back on network loss.
///
/// Never fails: the worst case is the offline response.
pub async fn network_first(
    backends: &Backends, request: &ProxyRequest, generation: &GenerationName, fallback: &Fallback,
) -> ProxyResponse {
    let key = request.cache_key();

    match backends.network.fetch(request).await {
        Ok(response) => {
            if storable(request, &response) {
                store(backends, generation, &key, &response.to_stored()).await;
            } else {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "response not storable");
            }
            response
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "network failed, trying cache");
            for candidate in fallback.search_order(generation) {
                if let Some(stored) = lookup(backends, &key, candidate).await {
                    tracing::debug!(url = %request.url, generation = %candidate, "serving stale copy");
                    return ProxyResponse::from_stored(stored);
                }
            }
            tracing::debug!(url = %request.url, "no cached copy, serving offline response");
            fallback.offline_response()
        }
    }
}

/// Refresh a cached entry without the caller waiting on it.
///
/// Failures end inside the task.
pub(crate) fn spawn_revalidation(
    backends: Backends, request: ProxyRequest, generation: GenerationName,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match backends.network.fetch(&request).await {
            Ok(response) if storable(&request, &response) => {
                let key = request.cache_key();
                match backends.store.put(generation.as_str(), &key, &response.to_stored()).await {
                    Ok(()) => tracing::debug!(url = %request.url, %generation, "revalidated"),
                    Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation write failed"),
                }
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "revalidation kept stale copy");
            }
            Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed"),
        }
    })
}

/// Whether `response` to `request` may enter the shared store.
pub(crate) fn storable(request: &ProxyRequest, response: &ProxyResponse) -> bool {
    response.is_storable() && !request.carries_credentials()
}

/// Store lookup where a store failure counts as a miss.
async fn lookup(backends: &Backends, key: &CacheKey, generation: &GenerationName) -> Option<StoredResponse> {
    match backends.store.lookup(key, Some(generation.as_str())).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(url = %key.url, %generation, error = %e, "cache lookup failed");
            None
        }
    }
}

async fn store(backends: &Backends, generation: &GenerationName, key: &CacheKey, response: &StoredResponse) {
    if let Err(e) = backends.store.put(generation.as_str(), key, response).await {
        tracing::warn!(url = %key.url, %generation, error = %e, "cache write failed");
    }
}
