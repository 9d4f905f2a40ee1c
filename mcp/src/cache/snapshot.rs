//! Snapshot persistence contract and structural validation.
//!
//! The durable store itself is an external collaborator; this module
//! defines the load/save contract, the serialized shape, and the
//! per-entry validation pass used during [`restore`].
//!
//! [`restore`]: super::store::ToolCache::restore

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{CacheEntry, ToolMetadata};
use crate::error::McpResult;

/// Serialized form of one alias entry. The entry's last error is not
/// persisted; restored entries start with a clean error state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSnapshot {
    pub alias: String,
    pub version_hash: String,
    pub refreshed_at: i64,
    pub tools: Vec<Value>,
}

impl From<&CacheEntry> for AliasSnapshot {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            alias: entry.alias.clone(),
            version_hash: entry.version_hash.clone(),
            refreshed_at: entry.refreshed_at,
            tools: entry
                .tools
                .values()
                .filter_map(|tool| serde_json::to_value(tool).ok())
                .collect(),
        }
    }
}

/// Full serialized cache: alias to entry.
pub type CacheSnapshot = BTreeMap<String, AliasSnapshot>;

/// Injected load/save contract for durable snapshots.
///
/// The cache treats the adapter as an external resource with no
/// transactional guarantee; concurrent saves from overlapping refreshes
/// may interleave, and last-write-wins is acceptable since each save
/// serializes the then-current full entry map.
#[async_trait]
pub trait CachePersistence: Send + Sync {
    async fn load(&self) -> McpResult<Option<Value>>;
    async fn save(&self, snapshot: &CacheSnapshot) -> McpResult<()>;
}

/// Validates one raw snapshot entry. A rejected entry carries the reason
/// so restoration can log it and keep going; tools lacking a usable name
/// are dropped individually rather than rejecting the entry.
pub(crate) fn validate_entry(key: &str, value: Value) -> Result<CacheEntry, String> {
    let snapshot: AliasSnapshot =
        serde_json::from_value(value).map_err(|err| format!("entry '{key}': {err}"))?;

    let alias = if snapshot.alias.trim().is_empty() {
        key.trim()
    } else {
        snapshot.alias.trim()
    };
    if alias.is_empty() {
        return Err(format!("entry '{key}': empty alias"));
    }
    if snapshot.version_hash.is_empty() {
        return Err(format!("entry '{key}': empty versionHash"));
    }
    if snapshot.refreshed_at < 0 {
        return Err(format!("entry '{key}': negative refreshedAt"));
    }

    let mut tools = BTreeMap::new();
    for tool_value in snapshot.tools {
        if let Ok(tool) = serde_json::from_value::<ToolMetadata>(tool_value) {
            if !tool.name.is_empty() {
                tools.insert(tool.name.clone(), tool);
            }
        }
    }

    Ok(CacheEntry {
        alias: alias.to_string(),
        version_hash: snapshot.version_hash,
        refreshed_at: snapshot.refreshed_at,
        tools,
        last_error: None,
    })
}
