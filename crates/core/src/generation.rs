//! Versioned cache generation names.
//!
//! A generation name embeds a prefix, a kind and a version tag, e.g.
//! `waypost-static-v1`. Bumping the version tag makes every previously
//! written generation stale; stale generations are deleted at activation.

use std::fmt;

/// The two partitions that are live at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    /// Long-lived assets, served cache-first.
    Static,
    /// API and page responses, served network-first.
    Dynamic,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Static => "static",
            GenerationKind::Dynamic => "dynamic",
        }
    }
}

/// Name of one cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationName {
    name: String,
}

impl GenerationName {
    pub fn new(prefix: &str, kind: GenerationKind, version: &str) -> Self {
        Self { name: format!("{prefix}-{}-{version}", kind.as_str()) }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq<str> for GenerationName {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for GenerationName {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl PartialEq<String> for GenerationName {
    fn eq(&self, other: &String) -> bool {
        &self.name == other
    }
}

impl AsRef<str> for GenerationName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// The current STATIC and DYNAMIC generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generations {
    pub static_assets: GenerationName,
    pub dynamic: GenerationName,
}

impl Generations {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            static_assets: GenerationName::new(prefix, GenerationKind::Static, version),
            dynamic: GenerationName::new(prefix, GenerationKind::Dynamic, version),
        }
    }

    pub fn get(&self, kind: GenerationKind) -> &GenerationName {
        match kind {
            GenerationKind::Static => &self.static_assets,
            GenerationKind::Dynamic => &self.dynamic,
        }
    }

    /// Whether `name` is one of the two current generations.
    pub fn is_current(&self, name: &str) -> bool {
        self.static_assets == name || self.dynamic == name
    }

    /// Names from `existing` that are not current, in input order.
    pub fn stale<'a>(&self, existing: &'a [String]) -> Vec<&'a str> {
        existing
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_current(name))
            .collect()
    }
}
