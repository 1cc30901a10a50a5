//! Wiring of the engine from configuration.

use std::sync::Arc;

use waypost_client::{Backends, Classifier, Dispatcher, Fallback, Lifecycle};
use waypost_core::{AppConfig, Error};

/// The lifecycle and the dispatcher bound to it.
pub struct App {
    lifecycle: Lifecycle,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    pub fn from_config(config: &AppConfig, backends: Backends) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = Lifecycle::resolve_manifest(&origin, &config.precache_manifest)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let lifecycle = Lifecycle::new(backends.clone(), config.generations(), manifest);
        let dispatcher = Dispatcher::new(
            backends,
            Classifier::from_config(config),
            config.generations(),
            Fallback::from_config(config),
            origin,
            lifecycle.subscribe(),
        );

        Ok(Self { lifecycle, dispatcher: Arc::new(dispatcher) })
    }

    /// Run install then activate.
    pub async fn start(&self) -> Result<(), Error> {
        let installed = self.lifecycle.install().await?;
        for failure in &installed.failed {
            tracing::info!(url = %failure.url, error = %failure.error, "skipped precache entry");
        }

        let activated = self.lifecycle.activate().await?;
        if !activated.deleted.is_empty() {
            tracing::info!(generations = ?activated.deleted, "deleted stale generations");
        }
        Ok(())
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}
