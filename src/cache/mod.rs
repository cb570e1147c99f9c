//! Persistent keyed cache
//!
//! This module provides a typed, crash-tolerant handle over one named slot
//! in the durable store. Reads are served from an in-memory mirror, writes
//! persist best-effort, and changes made by other execution contexts
//! sharing the store propagate into the mirror automatically.

mod cell;

pub use cell::{Environment, PersistentCell, SubscriptionId};
