//! # Papertrail Core
//!
//! Domain types, traits, and error definitions for the Papertrail research
//! assistant. This crate has **no framework dependencies**: it defines the
//! paper model and the three collaborator contracts that every other crate
//! implements against.
//!
//! ## Collaborators
//!
//! - [`PaperStore`]: keyed record repository (topic/year range, title lookup)
//! - [`DiscoverySource`]: external paper search (e.g. arXiv)
//! - [`Provider`]: text generation backend (`prompt → text`)
//!
//! Implementations live in `papertrail-store`, `papertrail-discovery` and
//! `papertrail-providers`, so tests can swap in mocks freely.

pub mod error;
pub mod paper;
pub mod provider;
pub mod store;
pub mod discovery;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use paper::{CitationReference, MetadataUpdate, PaperRecord};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use store::PaperStore;
pub use discovery::DiscoverySource;
