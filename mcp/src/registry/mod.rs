//! External server registry.
//!
//! Reads the server-list document from a configuration directory and
//! produces a mapping from alias to a fully-resolved connection
//! descriptor. `${VAR}` placeholders are expanded against the process
//! environment (enriched by layered `.env` files); an unresolved
//! placeholder fails the load.

pub mod env_files;
pub mod loader;
pub mod placeholder;
pub mod types;

pub use loader::{load_registry, REGISTRY_FILE_NAME};
pub use types::{
    DescriptorSource, ServerDescriptor, ServerRegistry, ServerTransport,
    RESERVED_ALIAS_SEPARATOR,
};
