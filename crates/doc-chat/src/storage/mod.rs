//! Persistent storage for document records
//!
//! The registry is a JSON array on disk, rewritten atomically on every change.

mod registry;

pub use registry::DocumentRegistry;
