pub mod backends;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;

// Re-export backends for convenience
pub use backends::memory::MemoryStore;
