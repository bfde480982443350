//! Embedding provider implementations.

#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod remote;
pub mod trigram;
