//! Per-request routing.
//!
//! Only same-origin GET requests are intercepted, and only once the lifecycle
//! has claimed control. Everything else goes straight to the network with no
//! cache reads or writes, and a cross-origin target must first pass the
//! address guard.

use reqwest::{Method, Url};
use tokio::sync::watch;
use waypost_core::{Error, Generations};

use crate::fetch::{ProxyRequest, ProxyResponse, same_origin, validate_target};
use crate::lifecycle::Phase;
use crate::route::{Category, Classifier};
use crate::strategy::{Backends, Fallback, cache_first, network_first};

/// How a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Intercepted(Category),
    /// Forwarded to the network untouched.
    Passthrough,
}

#[derive(Debug)]
pub struct Dispatched {
    pub route: Route,
    pub response: ProxyResponse,
}

pub struct Dispatcher {
    backends: Backends,
    classifier: Classifier,
    generations: Generations,
    fallback: Fallback,
    origin: Url,
    phase: watch::Receiver<Phase>,
}

impl Dispatcher {
    pub fn new(
        backends: Backends, classifier: Classifier, generations: Generations, fallback: Fallback, origin: Url,
        phase: watch::Receiver<Phase>,
    ) -> Self {
        Self { backends, classifier, generations, fallback, origin, phase }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether `request` is handled by the cache layer.
    pub fn intercepts(&self, request: &ProxyRequest) -> bool {
        *self.phase.borrow() == Phase::Active
            && request.method == Method::GET
            && same_origin(&self.origin, &request.url)
    }

    /// Answer one request.
    ///
    /// # Errors
    ///
    /// Fails when the network is unreachable for a pass-through request or
    /// for a static asset that is not cached, and with
    /// [`Error::TargetBlocked`] when a cross-origin target is private.
    pub async fn dispatch(&self, request: ProxyRequest) -> Result<Dispatched, Error> {
        if !self.intercepts(&request) {
            if !same_origin(&self.origin, &request.url) {
                validate_target(&request.url).await?;
            }
            tracing::debug!(method = %request.method, url = %request.url, "passing through");
            let response = self.backends.network.fetch(&request).await?;
            return Ok(Dispatched { route: Route::Passthrough, response });
        }

        let category = self.classifier.classify(request.url.path());
        let generation = self.generations.get(category.generation_kind());
        tracing::debug!(url = %request.url, category = category.as_str(), %generation, "intercepted");

        let response = match category {
            Category::Static => cache_first(&self.backends, &request, generation).await?,
            Category::Api | Category::Page => network_first(&self.backends, &request, generation, &self.fallback).await,
        };

        Ok(Dispatched { route: Route::Intercepted(category), response })
    }
}
