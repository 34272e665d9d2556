//! Estante
//!
//! A personal PDF library: an axum REST service backed by SQLite and
//! S3-compatible object storage, plus a client subsystem with an offline
//! cache, library synchronization, thumbnails and a reading session.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
