//! Client-side cache for query results.
//!
//! The cache is an explicit, injectable handle (no module-level state),
//! keyed by a stable hash of (table, query parameters). It provides:
//! - request coalescing: concurrent fetches for one key share one request,
//! - explicit `invalidate(key)` with per-key generation counters,
//! - a staleness window after which cached values are bypassed.

mod key;
mod layer;

pub use key::QueryKey;
pub use layer::{Hit, QueryCache, Source};
