//! External MCP server registry and tool discovery cache.
//!
//! ## Modules
//!
//! - [`registry`]: turns a declarative `servers.json` into validated,
//!   fully-resolved connection descriptors, with layered `.env` loading
//!   and `${VAR}` placeholder expansion
//! - [`cache`]: per-alias tool cache with TTL expiry, request coalescing,
//!   and optional durable snapshotting
//!
//! The wire-level MCP client and the snapshot store are external
//! collaborators, injected at the [`cache::ToolLister`] and
//! [`cache::CachePersistence`] seams. The registry is consulted by the
//! collaborator that constructs lister calls to know how to reach each
//! alias's server.

pub mod cache;
pub mod error;
pub mod registry;

// Re-export from cache
pub use cache::{
    version_hash, AliasSnapshot, AliasView, CacheEntry, CacheErrorState, CachePersistence,
    CacheSnapshot, EnsureOptions, ToolCache, ToolCacheConfig, ToolLister, ToolLookupOptions,
    ToolMetadata, DEFAULT_CACHE_TTL_MS,
};
pub use error::{McpError, McpResult};
// Re-export from registry
pub use registry::{
    load_registry, DescriptorSource, ServerDescriptor, ServerRegistry, ServerTransport,
    REGISTRY_FILE_NAME, RESERVED_ALIAS_SEPARATOR,
};
