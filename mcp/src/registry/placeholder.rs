//! `${VAR}` placeholder expansion.
//!
//! Pure string scanning over an injected lookup, so expansion is
//! unit-testable without mutating the real process environment. No
//! recursive expansion and no escaping: the variable's literal value is
//! substituted once.

use std::{collections::HashMap, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{McpError, McpResult};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("placeholder regex is valid"));

/// Expands every `${NAME}` token in `value` through `lookup`. A token
/// whose variable is absent fails the whole expansion; callers never see
/// a partially-resolved string.
pub fn expand_with<F>(
    value: &str,
    alias: &str,
    registry_path: &Path,
    lookup: F,
) -> McpResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(value) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&value[last..token.start()]);
        match lookup(name.as_str()) {
            Some(resolved) => out.push_str(&resolved),
            None => {
                return Err(McpError::Config(format!(
                    "Missing environment variable '{}' referenced by server '{}' in {}",
                    name.as_str(),
                    alias,
                    registry_path.display()
                )));
            }
        }
        last = token.end();
    }
    out.push_str(&value[last..]);
    Ok(out)
}

/// [`expand_with`] over the process environment.
pub fn expand(value: &str, alias: &str, registry_path: &Path) -> McpResult<String> {
    expand_with(value, alias, registry_path, |name| std::env::var(name).ok())
}

/// Expands every value of a string map (env vars, headers).
pub fn expand_map(
    values: &HashMap<String, String>,
    alias: &str,
    registry_path: &Path,
) -> McpResult<HashMap<String, String>> {
    expand_map_with(values, alias, registry_path, |name| std::env::var(name).ok())
}

/// [`expand_map`] over an injected lookup.
pub fn expand_map_with<F>(
    values: &HashMap<String, String>,
    alias: &str,
    registry_path: &Path,
    lookup: F,
) -> McpResult<HashMap<String, String>>
where
    F: Fn(&str) -> Option<String>,
{
    values
        .iter()
        .map(|(key, value)| Ok((key.clone(), expand_with(value, alias, registry_path, &lookup)?)))
        .collect()
}
