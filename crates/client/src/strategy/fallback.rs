//! What network-first does when the network produced nothing.

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use waypost_core::{AppConfig, FallbackScope, GenerationName, Generations};

use crate::fetch::{ProxyResponse, ResponseSource};

pub const OFFLINE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Synthesized 503 returned when neither cache nor network can answer.
/// Never stored.
pub fn offline_response(message: &str) -> ProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OFFLINE_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    ProxyResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, message.to_string(), ResponseSource::Fallback)
}

/// Where to look for a stale copy, and what to say when there is none.
#[derive(Debug, Clone)]
pub struct Fallback {
    generations: Generations,
    scope: FallbackScope,
    message: String,
}

impl Fallback {
    pub fn new(generations: Generations, scope: FallbackScope, message: impl Into<String>) -> Self {
        Self { generations, scope, message: message.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.generations(), config.fallback_scope, config.offline_message.clone())
    }

    /// Generations to search, target first.
    pub fn search_order<'a>(&'a self, target: &'a GenerationName) -> Vec<&'a GenerationName> {
        let mut order = vec![target];
        if self.scope == FallbackScope::Current {
            for current in [&self.generations.dynamic, &self.generations.static_assets] {
                if current != target {
                    order.push(current);
                }
            }
        }
        order
    }

    pub fn offline_response(&self) -> ProxyResponse {
        offline_response(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_response_shape() {
        let response = offline_response("You are offline.");
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(&response.body[..], b"You are offline.");
    }

    #[test]
    fn test_search_order_target_scope() {
        let generations = Generations::new("waypost", "v1");
        let fallback = Fallback::new(generations.clone(), FallbackScope::Target, "offline");
        let order = fallback.search_order(&generations.dynamic);
        assert_eq!(order, vec![&generations.dynamic]);
    }

    #[test]
    fn test_search_order_current_scope() {
        let generations = Generations::new("waypost", "v1");
        let fallback = Fallback::new(generations.clone(), FallbackScope::Current, "offline");

        let order = fallback.search_order(&generations.dynamic);
        assert_eq!(order, vec![&generations.dynamic, &generations.static_assets]);

        let order = fallback.search_order(&generations.static_assets);
        assert_eq!(order, vec![&generations.static_assets, &generations.dynamic]);
    }

    #[test]
    fn test_from_config_uses_message() {
        let config = AppConfig { offline_message: "Sem conexão".into(), ..Default::default() };
        let response = Fallback::from_config(&config).offline_response();
        assert_eq!(std::str::from_utf8(&response.body).unwrap(), "Sem conexão");
    }
}
