//! Concrete implementations of the storage gateway.

pub mod postgrest;

pub use postgrest::{PostgrestActionStore, PostgrestConfig};
