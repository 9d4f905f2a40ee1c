//! Per-alias tool cache with TTL expiry, request coalescing, and
//! optional durable snapshotting.
//!
//! At most one live fetch runs per alias at a time: concurrent refresh
//! requests for the same alias share a single in-flight future instead
//! of issuing a second remote call. A forced refresh that arrives while
//! a refresh is already in flight also joins it rather than starting
//! another fetch.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::warn;

use super::{
    snapshot::{validate_entry, AliasSnapshot, CachePersistence, CacheSnapshot},
    types::{now_ms, AliasView, CacheEntry, CacheErrorState, ToolMetadata},
};
use crate::error::{McpError, McpResult};

/// Fetches the live tool listing for one alias. Wire-level concerns
/// (process spawning, HTTP, timeouts) live behind this boundary; the
/// cache neither retries nor rewrites its errors.
#[async_trait]
pub trait ToolLister: Send + Sync {
    async fn list(
        &self,
        alias: &str,
        config_dir: &Path,
        force_live: bool,
    ) -> McpResult<Vec<ToolMetadata>>;
}

pub const DEFAULT_CACHE_TTL_MS: i64 = 5 * 60 * 1000;

/// Cache construction options.
#[derive(Clone)]
pub struct ToolCacheConfig {
    /// Entry time-to-live in milliseconds. Zero or negative means
    /// entries never expire.
    pub ttl_ms: i64,
    pub persistence: Option<Arc<dyn CachePersistence>>,
}

impl Default for ToolCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            persistence: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureOptions {
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolLookupOptions {
    pub force_refresh: bool,
    /// On a miss, perform one forced refresh and retry the lookup once.
    pub refresh_if_missing: bool,
}

impl Default for ToolLookupOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            refresh_if_missing: true,
        }
    }
}

type InflightRefresh = Shared<BoxFuture<'static, Result<CacheEntry, McpError>>>;

/// Explicit cache object owning the entry map and the in-flight map.
/// Callers hold a reference; there is no ambient singleton.
pub struct ToolCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    config_dir: PathBuf,
    ttl_ms: i64,
    lister: Arc<dyn ToolLister>,
    persistence: Option<Arc<dyn CachePersistence>>,
    entries: DashMap<String, CacheEntry>,
    inflight: DashMap<String, InflightRefresh>,
}

impl ToolCache {
    pub fn new(
        config_dir: impl Into<PathBuf>,
        lister: Arc<dyn ToolLister>,
        config: ToolCacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config_dir: config_dir.into(),
                ttl_ms: config.ttl_ms,
                lister,
                persistence: config.persistence,
                entries: DashMap::new(),
                inflight: DashMap::new(),
            }),
        }
    }

    /// One-time restore from the persistence adapter; no-op without one.
    /// Restored entries are trusted as-is, so they may already be stale
    /// and will refresh on next access. One bad entry never aborts the
    /// rest.
    pub async fn restore(&self) {
        let Some(persistence) = self.inner.persistence.as_ref() else {
            return;
        };
        let snapshot = match persistence.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(err) => {
                warn!("Failed to load tool cache snapshot: {err}");
                return;
            }
        };
        let serde_json::Value::Object(raw_entries) = snapshot else {
            warn!("Tool cache snapshot is not an object; ignoring it");
            return;
        };
        for (key, value) in raw_entries {
            match validate_entry(&key, value) {
                Ok(entry) => {
                    self.inner.entries.insert(entry.alias.clone(), entry);
                }
                Err(reason) => warn!("Discarding invalid tool cache snapshot {reason}"),
            }
        }
    }

    /// Guarantees a fresh entry for `alias`, refreshing if absent, stale,
    /// or forced. No-op when already fresh and not forced.
    pub async fn ensure_alias(&self, alias: &str, options: EnsureOptions) -> McpResult<()> {
        self.ensure_entry(alias, options).await.map(|_| ())
    }

    /// [`ensure_alias`] over the deduplicated, normalized alias set,
    /// refreshing distinct aliases concurrently. No ordering is
    /// guaranteed between aliases.
    ///
    /// [`ensure_alias`]: Self::ensure_alias
    pub async fn ensure_aliases<I, S>(&self, aliases: I, options: EnsureOptions) -> McpResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for alias in aliases {
            let trimmed = alias.as_ref().trim();
            if trimmed.is_empty() || unique.iter().any(|known| known == trimmed) {
                continue;
            }
            unique.push(trimmed.to_string());
        }
        futures::future::try_join_all(
            unique.iter().map(|alias| self.ensure_alias(alias, options)),
        )
        .await?;
        Ok(())
    }

    /// Looks up a tool by exact name. On a miss with `refresh_if_missing`
    /// set (the default), performs one forced refresh and retries once;
    /// this covers a remote server that grew a tool after the cache was
    /// last populated. Bounded to exactly one retry, never a loop.
    pub async fn get_tool(
        &self,
        alias: &str,
        tool_name: &str,
        options: ToolLookupOptions,
    ) -> McpResult<ToolMetadata> {
        let tool_name = tool_name.trim();
        if tool_name.is_empty() {
            return Err(McpError::InvalidArguments(
                "Tool name must be a non-empty string".to_string(),
            ));
        }

        let mut entry = self
            .ensure_entry(
                alias,
                EnsureOptions {
                    force_refresh: options.force_refresh,
                },
            )
            .await?;
        if !entry.tools.contains_key(tool_name) && options.refresh_if_missing {
            entry = self.refresh_alias(&entry.alias).await?;
        }
        entry
            .tools
            .get(tool_name)
            .cloned()
            .ok_or_else(|| McpError::ToolNotFound {
                alias: entry.alias.clone(),
                tool: tool_name.to_string(),
            })
    }

    /// Read-only snapshot of one alias, or `None` for an alias never
    /// cached. `stale` is computed at call time.
    pub fn alias_view(&self, alias: &str) -> Option<AliasView> {
        let normalized = alias.trim();
        if normalized.is_empty() {
            return None;
        }
        let entry = self.inner.entries.get(normalized)?;
        let entry = entry.value();
        Some(AliasView {
            alias: entry.alias.clone(),
            version_hash: entry.version_hash.clone(),
            refreshed_at: entry.refreshed_at,
            stale: self.inner.is_expired(entry),
            tool_count: entry.tools.len(),
            tools: entry.tools.values().cloned().collect(),
            last_error: entry.last_error.clone(),
        })
    }

    /// All aliases with at least one entry, regardless of freshness.
    pub fn known_aliases(&self) -> Vec<String> {
        self.inner.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn ensure_entry(&self, alias: &str, options: EnsureOptions) -> McpResult<CacheEntry> {
        let normalized = normalize_alias(alias)?;
        if !options.force_refresh {
            if let Some(existing) = self.inner.entries.get(&normalized) {
                if !self.inner.is_expired(existing.value()) {
                    return Ok(existing.value().clone());
                }
            }
        }
        self.refresh_alias(&normalized).await
    }

    async fn refresh_alias(&self, alias: &str) -> McpResult<CacheEntry> {
        let normalized = normalize_alias(alias)?;
        // The entry API guarantees a single shared future per alias; late
        // arrivals (forced or not) attach to it instead of fetching again.
        let pending = {
            let guard = self.inner.inflight.entry(normalized.clone()).or_insert_with(|| {
                CacheInner::refresh_future(Arc::clone(&self.inner), normalized.clone())
            });
            guard.value().clone()
        };
        let result = pending.clone().await;
        // Clear the marker only if it still belongs to this operation.
        self.inner
            .inflight
            .remove_if(&normalized, |_, current| current.ptr_eq(&pending));
        result
    }
}

impl CacheInner {
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        if self.ttl_ms <= 0 {
            return false;
        }
        now_ms() - entry.refreshed_at > self.ttl_ms
    }

    fn refresh_future(inner: Arc<Self>, alias: String) -> InflightRefresh {
        async move {
            match inner.lister.list(&alias, &inner.config_dir, true).await {
                Ok(tools) => {
                    let entry = CacheEntry::from_listing(&alias, tools);
                    inner.entries.insert(alias.clone(), entry.clone());
                    inner.persist_snapshot().await;
                    Ok(entry)
                }
                Err(err) => {
                    // A failed refresh never clears previously cached tools.
                    if let Some(mut existing) = inner.entries.get_mut(&alias) {
                        existing.last_error = Some(CacheErrorState {
                            message: err.to_string(),
                            timestamp: now_ms(),
                        });
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Best-effort: persistence failures are logged, never surfaced.
    async fn persist_snapshot(&self) {
        let Some(persistence) = self.persistence.as_ref() else {
            return;
        };
        let snapshot: CacheSnapshot = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), AliasSnapshot::from(entry.value())))
            .collect();
        if let Err(err) = persistence.save(&snapshot).await {
            warn!("Failed to persist tool cache snapshot: {err}");
        }
    }
}

fn normalize_alias(alias: &str) -> McpResult<String> {
    let trimmed = alias.trim();
    if trimmed.is_empty() {
        return Err(McpError::InvalidArguments(
            "Server alias must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
