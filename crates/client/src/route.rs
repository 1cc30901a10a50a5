//! Request classification by URL path.

use waypost_core::{AppConfig, GenerationKind};

/// Category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Immutable asset, served cache-first.
    Static,
    /// API call, served network-first.
    Api,
    /// Anything else, served network-first.
    Page,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Static => "static",
            Category::Api => "api",
            Category::Page => "page",
        }
    }

    /// Generation a request of this category is cached in.
    pub fn generation_kind(&self) -> GenerationKind {
        match self {
            Category::Static => GenerationKind::Static,
            Category::Api | Category::Page => GenerationKind::Dynamic,
        }
    }
}

/// Prefix-based path classifier.
///
/// API prefixes are checked before static prefixes; a path matching
/// neither is a page.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    api_prefixes: Vec<String>,
    static_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(api_prefixes: Vec<String>, static_prefixes: Vec<String>) -> Self {
        Self { api_prefixes, static_prefixes }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_prefixes.clone(), config.static_prefixes.clone())
    }

    pub fn classify(&self, path: &str) -> Category {
        if self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            Category::Api
        } else if self.static_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            Category::Static
        } else {
            Category::Page
        }
    }
}
