//! Storage backends for the repository traits

pub mod memory;

pub use memory::{MemoryIdentityRepository, MemoryRepositoryProvider, MemorySessionRepository};
