//! Tool discovery cache.
//!
//! Holds the last known tool listing per alias together with a content
//! hash and a refresh timestamp. Concurrent refreshes for one alias
//! coalesce into a single live fetch; snapshots persist through an
//! injected adapter.

pub mod snapshot;
pub mod store;
pub mod types;

pub use snapshot::{AliasSnapshot, CachePersistence, CacheSnapshot};
pub use store::{
    EnsureOptions, ToolCache, ToolCacheConfig, ToolLister, ToolLookupOptions,
    DEFAULT_CACHE_TTL_MS,
};
pub use types::{version_hash, AliasView, CacheEntry, CacheErrorState, ToolMetadata};
