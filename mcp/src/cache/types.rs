//! Cache data model: tool metadata, entries, and read-only views.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Metadata describing one callable tool exposed by a remote server.
///
/// Schemas are opaque to this subsystem; they are hashed and compared
/// only as serialized values. Unknown fields round-trip through
/// snapshots untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
            output_schema: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// The most recent refresh failure for an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheErrorState {
    pub message: String,
    pub timestamp: i64,
}

/// One alias's cached state. At most one entry per alias exists at any
/// time; `tools` always reflects the most recent successful refresh even
/// when a later attempt failed.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub alias: String,
    pub version_hash: String,
    /// Epoch milliseconds of the last successful refresh.
    pub refreshed_at: i64,
    pub tools: BTreeMap<String, ToolMetadata>,
    pub last_error: Option<CacheErrorState>,
}

impl CacheEntry {
    /// Builds a fresh entry from a live listing. Last write wins when the
    /// lister returns duplicate names.
    pub fn from_listing(alias: &str, tools: Vec<ToolMetadata>) -> Self {
        let version_hash = version_hash(&tools);
        let mut map = BTreeMap::new();
        for tool in tools {
            map.insert(tool.name.clone(), tool);
        }
        Self {
            alias: alias.to_string(),
            version_hash,
            refreshed_at: now_ms(),
            tools: map,
            last_error: None,
        }
    }
}

/// Read-only snapshot of one alias's cached state.
#[derive(Debug, Clone)]
pub struct AliasView {
    pub alias: String,
    pub version_hash: String,
    pub refreshed_at: i64,
    /// Computed at call time, not cached.
    pub stale: bool,
    pub tool_count: usize,
    pub tools: Vec<ToolMetadata>,
    pub last_error: Option<CacheErrorState>,
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
    output_schema: &'a Value,
}

/// Content hash over a normalized tool listing: tools sorted by name
/// ascending, absent descriptions as empty strings, absent schemas as
/// null, passthrough fields excluded. Detects change without relying on
/// timestamps alone.
pub fn version_hash(tools: &[ToolMetadata]) -> String {
    let mut normalized: Vec<HashedTool<'_>> = tools
        .iter()
        .map(|tool| HashedTool {
            name: &tool.name,
            description: tool.description.as_deref().unwrap_or(""),
            input_schema: tool.input_schema.as_ref().unwrap_or(&Value::Null),
            output_schema: tool.output_schema.as_ref().unwrap_or(&Value::Null),
        })
        .collect();
    normalized.sort_by(|a, b| a.name.cmp(b.name));

    let serialized = serde_json::to_vec(&normalized).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    format!("{:x}", hasher.finalize())
}
