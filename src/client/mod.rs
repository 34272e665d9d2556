//! Client-side library subsystem
//!
//! Everything a reading frontend needs on top of the REST service: an
//! authenticated API client, a SQLite-backed local cache, the synchronizer
//! that reconciles the two, thumbnail generation and the reading session.

pub mod api;
pub mod cache;
pub mod normalize;
pub mod reader;
pub mod sync;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testpdf;
#[cfg(test)]
pub(crate) mod testremote;
