//! Error types for registry loading and the tool cache.
//!
//! One crate-level enum covers configuration, lookup, transport, and
//! persistence failures. The enum is `Clone` so a shared in-flight
//! refresh result can be handed to every caller that joined it.

use thiserror::Error;

pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Clone, Error)]
pub enum McpError {
    /// Registry or document malformed, missing/duplicate alias,
    /// unsupported transport type, or an unresolved placeholder. Fatal to
    /// the load that raised it; never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool still absent after the single refresh-and-retry.
    #[error("Server '{alias}' does not expose tool '{tool}'. Refresh the cache or inspect the server's live tool listing.")]
    ToolNotFound { alias: String, tool: String },

    /// Tool Lister failure, recorded as the entry's last error and
    /// re-thrown unmodified.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Snapshot load/save failure. The cache logs and swallows these and
    /// keeps operating in memory.
    #[error("Persistence error: {0}")]
    Persistence(String),
}
