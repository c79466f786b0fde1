//! Feedle Client - HTTP clients for content sources
//!
//! This crate provides the source clients used by the fetch pipeline:
//!
//! - [`reddit`] - Reddit listing and search over the JSON API
//! - [`token`] - OAuth client-credentials token cache
//! - [`source`] - Enum dispatch over clients and registry construction
//!
//! # Overview
//!
//! The clients handle authentication, request building, pagination, response
//! parsing and error mapping, and hand back [`feedle_core::NormalizedRecord`]s.

pub mod reddit;
pub mod source;
pub mod token;

// Re-export main client types
pub use reddit::RedditClient;
pub use source::{SourceClientEnum, build_registry};
pub use token::{RedditCredentials, TokenCache};
