//! Mock collaborators for testing.
//!
//! In-memory stand-ins for the remote gateway. For the local cache use
//! [`MemoryCache`](crate::cache::MemoryCache), which is a real implementation.

pub mod gateway;

pub use gateway::MockGateway;
