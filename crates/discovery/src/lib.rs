//! Paper discovery for Papertrail.
//!
//! [`ArxivSource`] talks to the arXiv Atom API; [`SearchService`] filters
//! discoveries to a year window and persists them to a paper store in the
//! background.

pub mod arxiv;
pub mod service;

pub use arxiv::ArxivSource;
pub use service::{Discovery, PersistHandle, PersistReport, SearchService};
