//! Install and activate.
//!
//! Install opens the static generation and pre-populates it from the
//! manifest. Activate deletes every generation that is not current and then
//! claims control, after which the dispatcher starts intercepting.

use futures_util::future::join_all;
use reqwest::{StatusCode, Url};
use tokio::sync::watch;
use waypost_core::{Error, Generations};

use crate::fetch::{ProxyRequest, UrlError, resolve};
use crate::strategy::{Backends, storable};

/// Where the lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Installing,
    /// Pre-population finished; waiting to activate.
    Installed,
    /// Stale generations removed; requests are intercepted.
    Active,
}

/// Why one manifest URL was not cached.
#[derive(Debug, thiserror::Error)]
pub enum PrecacheError {
    #[error("fetch failed: {0}")]
    Network(Error),

    #[error("upstream returned {0}")]
    Status(StatusCode),

    #[error("upstream returned {0} that may not be stored")]
    NotStorable(StatusCode),

    #[error("store failed: {0}")]
    Store(Error),
}

#[derive(Debug)]
pub struct PrecacheFailure {
    pub url: Url,
    pub error: PrecacheError,
}

/// Outcome of [`Lifecycle::install`].
#[derive(Debug)]
pub struct InstallReport {
    pub generation: String,
    pub cached: Vec<Url>,
    pub failed: Vec<PrecacheFailure>,
}

/// Outcome of [`Lifecycle::activate`].
#[derive(Debug, Default)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed; retried at the next activation.
    pub retained: Vec<String>,
}

pub struct Lifecycle {
    backends: Backends,
    generations: Generations,
    manifest: Vec<Url>,
    phase: watch::Sender<Phase>,
}

impl Lifecycle {
    pub fn new(backends: Backends, generations: Generations, manifest: Vec<Url>) -> Self {
        let (phase, _) = watch::channel(Phase::Installing);
        Self { backends, generations, manifest, phase }
    }

    /// Resolve manifest paths against `origin`.
    pub fn resolve_manifest(origin: &Url, paths: &[String]) -> Result<Vec<Url>, UrlError> {
        paths.iter().map(|p| resolve(origin, p)).collect()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver that observes phase changes.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Open the static generation and pre-populate it.
    ///
    /// Every manifest URL is attempted independently; failures are reported,
    /// never fatal. Resolves only after every attempt has finished.
    ///
    /// # Errors
    ///
    /// Returns an error only if the static generation cannot be opened.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.phase.send_replace(Phase::Installing);
        let generation = &self.generations.static_assets;
        self.backends.store.open(generation.as_str()).await?;

        let outcomes = join_all(self.manifest.iter().map(|url| async move { (url, self.precache(url).await) })).await;

        let mut report = InstallReport { generation: generation.to_string(), cached: Vec::new(), failed: Vec::new() };
        for (url, outcome) in outcomes {
            match outcome {
                Ok(()) => report.cached.push(url.clone()),
                Err(error) => {
                    tracing::warn!(%url, %error, "precache failed");
                    report.failed.push(PrecacheFailure { url: url.clone(), error });
                }
            }
        }

        tracing::info!(
            %generation,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "install complete"
        );

        // No waiting on sessions bound to the previous version.
        self.phase.send_replace(Phase::Installed);
        Ok(report)
    }

    async fn precache(&self, url: &Url) -> Result<(), PrecacheError> {
        let request = ProxyRequest::get(url.clone());
        let response = self.backends.network.fetch(&request).await.map_err(PrecacheError::Network)?;
        if !response.is_success() {
            return Err(PrecacheError::Status(response.status));
        }
        if !storable(&request, &response) {
            return Err(PrecacheError::NotStorable(response.status));
        }
        self.backends
            .store
            .put(self.generations.static_assets.as_str(), &request.cache_key(), &response.to_stored())
            .await
            .map_err(PrecacheError::Store)
    }

    /// Delete every generation that is not current, then claim control.
    ///
    /// # Errors
    ///
    /// Returns an error if the generation names cannot be listed. A failed
    /// delete is logged and reported in `retained`.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let names = self.backends.store.names().await?;
        let stale = self.generations.stale(&names);

        let results = join_all(stale.iter().map(|name| async move { (*name, self.backends.store.delete(name).await) })).await;

        let mut report = ActivateReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => report.deleted.push(name.to_string()),
                Err(e) => {
                    tracing::warn!(generation = name, error = %e, "failed to delete stale generation");
                    report.retained.push(name.to_string());
                }
            }
        }

        self.phase.send_replace(Phase::Active);
        tracing::info!(
            static_generation = %self.generations.static_assets,
            dynamic_generation = %self.generations.dynamic,
            deleted = report.deleted.len(),
            "activated and claimed control"
        );
        Ok(report)
    }
}
