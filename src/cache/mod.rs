//! Cache Module
//!
//! Status-tracked object caching on top of a key-value store.

mod object_cache;
mod stats;


// Re-export public types
pub use object_cache::ObjectCache;
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;
