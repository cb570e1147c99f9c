//! LeafWise Library
//!
//! Maize leaf disease scanning: a persistent keyed cache over a durable
//! key-value store, a bounded most-recent-first scan history built on it,
//! and a client for the AI analysis backend.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod history;
pub mod store;
