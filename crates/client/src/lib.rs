//! Request-interception engine for waypost.
//!
//! This crate provides the network client, request classification, the
//! cache-first and network-first strategies, the install/activate lifecycle
//! and the dispatcher that ties them together.

pub mod dispatch;
pub mod fetch;
pub mod lifecycle;
pub mod route;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use dispatch::{Dispatched, Dispatcher, Route};
pub use fetch::{FetchClient, FetchConfig, NetworkClient, ProxyRequest, ProxyResponse, ResponseSource};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle, Phase, PrecacheError, PrecacheFailure};
pub use route::{Category, Classifier};
pub use strategy::{Backends, Fallback, cache_first, network_first, offline_response};
