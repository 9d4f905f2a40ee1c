//! Registry loading and validation.
//!
//! `load_registry` reads `servers.json` from the config directory, layers
//! optional `.env` files into the process environment, validates every
//! entry, and expands `${VAR}` placeholders. Any structural problem or
//! unresolved placeholder fails the whole load with a configuration
//! error carrying the document path and alias context.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    env_files, placeholder,
    types::{
        DescriptorSource, ServerDescriptor, ServerRegistry, ServerTransport,
        RESERVED_ALIAS_SEPARATOR,
    },
};
use crate::error::{McpError, McpResult};

pub const REGISTRY_FILE_NAME: &str = "servers.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServer {
    #[serde(rename = "type")]
    kind: Option<String>,
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    cwd: Option<String>,
    url: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
    env: Option<HashMap<String, String>>,
    auth: Option<Value>,
    token_cache_dir: Option<String>,
    client_name: Option<String>,
    oauth_redirect_url: Option<String>,
    description: Option<String>,
}

pub async fn load_registry(config_dir: impl AsRef<Path>) -> McpResult<ServerRegistry> {
    let config_dir = config_dir.as_ref();
    if config_dir.as_os_str().is_empty() {
        return Err(McpError::Config(
            "External MCP servers require a config directory containing servers.json".to_string(),
        ));
    }
    let config_dir = absolutize(config_dir);

    env_files::load_env_files(&config_dir);

    let registry_path = config_dir.join(REGISTRY_FILE_NAME);
    let raw = tokio::fs::read_to_string(&registry_path).await.map_err(|_| {
        McpError::Config(format!(
            "Missing MCP server registry at {}. Create servers.json with your server definitions.",
            registry_path.display()
        ))
    })?;

    let document: Value = serde_json::from_str(&raw).map_err(|err| {
        McpError::Config(format!(
            "servers.json at {} is invalid JSON: {err}",
            registry_path.display()
        ))
    })?;
    let Some(raw_servers) = document.get("servers").and_then(Value::as_object) else {
        return Err(McpError::Config(format!(
            "servers.json at {} is invalid: missing 'servers' object",
            registry_path.display()
        )));
    };

    let mut servers: HashMap<String, ServerDescriptor> = HashMap::new();
    for (alias, entry) in raw_servers {
        let normalized = alias.trim();
        if normalized.is_empty() {
            return Err(McpError::Config(
                "Server aliases must be non-empty strings without whitespace.".to_string(),
            ));
        }
        if normalized.contains(RESERVED_ALIAS_SEPARATOR) {
            return Err(McpError::Config(format!(
                "Server alias '{alias}' must not contain '{RESERVED_ALIAS_SEPARATOR}'. Use the bare alias; the tool suffix is appended automatically."
            )));
        }
        if servers.contains_key(normalized) {
            return Err(McpError::Config(format!(
                "Duplicate server alias '{normalized}' detected in servers.json."
            )));
        }
        if !entry.is_object() {
            return Err(McpError::Config(format!(
                "servers.json at {} is invalid: server '{alias}' must be an object",
                registry_path.display()
            )));
        }
        let raw: RawServer = serde_json::from_value(entry.clone()).map_err(|err| {
            McpError::Config(format!(
                "servers.json at {} is invalid: server '{alias}': {err}",
                registry_path.display()
            ))
        })?;

        let descriptor = build_descriptor(normalized, raw, &config_dir, &registry_path)?;
        servers.insert(normalized.to_string(), descriptor);
    }

    if servers.is_empty() {
        return Err(McpError::Config(format!(
            "No servers declared in {}. Add at least one MCP server to register external tools.",
            registry_path.display()
        )));
    }

    Ok(ServerRegistry {
        config_dir,
        registry_path,
        servers,
    })
}

fn build_descriptor(
    alias: &str,
    raw: RawServer,
    config_dir: &Path,
    registry_path: &Path,
) -> McpResult<ServerDescriptor> {
    let env = raw
        .env
        .map(|values| placeholder::expand_map(&values, alias, registry_path))
        .transpose()?;
    let token_cache_dir = raw
        .token_cache_dir
        .map(|dir| placeholder::expand(&dir, alias, registry_path))
        .transpose()?
        .map(|dir| resolve_path(config_dir, &dir));

    let transport = match raw.kind.as_deref().unwrap_or("") {
        "http" => {
            let Some(url_raw) = raw.url else {
                return Err(McpError::Config(format!(
                    "servers.json at {} is invalid: server '{alias}' of type 'http' requires a 'url'",
                    registry_path.display()
                )));
            };
            let url_resolved = placeholder::expand(&url_raw, alias, registry_path)?;
            let url = Url::parse(&url_resolved).map_err(|err| {
                McpError::Config(format!(
                    "servers.json at {} is invalid: server '{alias}' has malformed url '{url_resolved}': {err}",
                    registry_path.display()
                ))
            })?;
            let headers = placeholder::expand_map(&raw.headers, alias, registry_path)?;
            ServerTransport::Http { url, headers }
        }
        "stdio" => {
            let Some(command_raw) = raw.command else {
                return Err(McpError::Config(format!(
                    "servers.json at {} is invalid: server '{alias}' of type 'stdio' requires a 'command'",
                    registry_path.display()
                )));
            };
            let command = placeholder::expand(&command_raw, alias, registry_path)?;
            let args = raw
                .args
                .iter()
                .map(|arg| placeholder::expand(arg, alias, registry_path))
                .collect::<McpResult<Vec<_>>>()?;
            let cwd = match raw.cwd {
                Some(cwd) => {
                    resolve_path(config_dir, &placeholder::expand(&cwd, alias, registry_path)?)
                }
                None => config_dir.to_path_buf(),
            };
            ServerTransport::Stdio { command, args, cwd }
        }
        other => {
            return Err(McpError::Config(format!(
                "servers.json at {} is invalid: server '{alias}' has unsupported type '{other}'",
                registry_path.display()
            )));
        }
    };

    Ok(ServerDescriptor {
        alias: alias.to_string(),
        description: raw.description,
        transport,
        env,
        auth: raw.auth,
        token_cache_dir,
        client_name: raw.client_name,
        oauth_redirect_url: raw.oauth_redirect_url,
        source: DescriptorSource {
            registry_path: registry_path.to_path_buf(),
        },
    })
}

fn resolve_path(config_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
