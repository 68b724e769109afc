//! Content-addressed result cache.
//!
//! Entries are bounded by an approximate byte size rather than by count, and
//! evicted strictly by least-recent access.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod weight;

pub use cache::{CacheStats, ResultCache, ResultCacheConfig};
pub use weight::Weighted;
