// Store module structure
pub mod errors;
mod adapter;
mod backend;
mod file;

// Re-export commonly used types
pub use adapter::{Decoded, StoreAdapter};
pub use backend::{KeyChange, MemoryBackend, StoreBackend};
pub use errors::StoreError;
pub use file::FileBackend;

// Re-export test backends for both testing and when the mock feature is enabled
#[cfg(any(test, feature = "mock"))]
pub use backend::tests;
