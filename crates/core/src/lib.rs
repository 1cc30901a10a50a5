//! Core types and shared functionality for waypost.
//!
//! This crate provides:
//! - Cache store trait with SQLite and in-memory backends
//! - Versioned cache generation names
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod model;

pub use cache::{CacheDb, CacheStore, MemoryCache};
pub use config::{AppConfig, ConfigError, FallbackScope};
pub use error::Error;
pub use generation::{GenerationKind, GenerationName, Generations};
pub use model::{CacheKey, StoredResponse};
