//! Registry data model: transports and fully-resolved server descriptors.

use std::{collections::HashMap, fmt, path::PathBuf};

use url::Url;

/// Aliases must not contain this character; the surrounding system uses
/// it to join an alias with a tool name.
pub const RESERVED_ALIAS_SEPARATOR: char = ':';

/// How to reach one server. Every string field is fully placeholder-
/// resolved by the loader before a transport is constructed.
#[derive(Clone)]
pub enum ServerTransport {
    Stdio {
        command: String,
        args: Vec<String>,
        cwd: PathBuf,
    },
    Http {
        url: Url,
        headers: HashMap<String, String>,
    },
}

impl fmt::Debug for ServerTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerTransport::Stdio { command, args, cwd } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("cwd", cwd)
                .finish(),
            ServerTransport::Http { url, headers } => f
                .debug_struct("Http")
                .field("url", &url.as_str())
                .field("headers", &format!("{} headers", headers.len()))
                .finish(),
        }
    }
}

/// Where a descriptor was loaded from. Diagnostics only.
#[derive(Debug, Clone)]
pub struct DescriptorSource {
    pub registry_path: PathBuf,
}

/// One fully-resolved server definition. Immutable after load; reloading
/// the registry yields fresh descriptors rather than mutating old ones.
#[derive(Debug, Clone)]
pub struct ServerDescriptor {
    pub alias: String,
    pub description: Option<String>,
    pub transport: ServerTransport,
    /// Extra environment passed to the server process, placeholder-resolved.
    pub env: Option<HashMap<String, String>>,
    /// Opaque passthrough for the transport collaborator.
    pub auth: Option<serde_json::Value>,
    pub token_cache_dir: Option<PathBuf>,
    pub client_name: Option<String>,
    pub oauth_redirect_url: Option<String>,
    pub source: DescriptorSource,
}

/// Validated mapping from alias to descriptor. Never empty after a
/// successful load.
#[derive(Debug, Clone)]
pub struct ServerRegistry {
    pub config_dir: PathBuf,
    pub registry_path: PathBuf,
    pub servers: HashMap<String, ServerDescriptor>,
}

impl ServerRegistry {
    pub fn get(&self, alias: &str) -> Option<&ServerDescriptor> {
        self.servers.get(alias.trim())
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }
}
