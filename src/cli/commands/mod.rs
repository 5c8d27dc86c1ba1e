//! Command implementations for the `repsync` binary.
//!
//! Each read command loads a JSON fixture into a [`MemoryStore`], builds a
//! [`SubscriptionCache`] over it and performs its operation through the cache.

/// `get-collection`
pub mod collection;
/// `config show`
pub mod config;
/// `get-document`
pub mod document;
/// `stats`
pub mod stats;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::adapters::memory::MemoryStore;
use crate::domain::models::CacheConfig;
use crate::services::SubscriptionCache;

/// Load `fixture` into a fresh store and wrap it in a cache.
pub async fn open_cache(fixture: &Path, config: &CacheConfig) -> Result<SubscriptionCache> {
    let raw = tokio::fs::read_to_string(fixture)
        .await
        .with_context(|| format!("Failed to read fixture {}", fixture.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Fixture {} is not valid JSON", fixture.display()))?;
    let store = MemoryStore::from_fixture(&parsed)
        .with_context(|| format!("Fixture {} has an unexpected shape", fixture.display()))?;

    tracing::debug!(fixture = %fixture.display(), "fixture loaded");
    Ok(SubscriptionCache::with_config(Arc::new(store), config.clone()))
}

/// Parse a `field=value` filter. The value is JSON when it parses as JSON,
/// otherwise a plain string.
pub fn parse_filter(raw: &str) -> Result<(String, Value)> {
    let (field, value) = raw
        .split_once('=')
        .with_context(|| format!("Filter '{raw}' must look like field=value"))?;
    let field = field.trim();
    if field.is_empty() {
        anyhow::bail!("Filter '{raw}' has an empty field name");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter_json_and_plain_values() {
        assert_eq!(parse_filter("reps=5").unwrap(), ("reps".to_string(), json!(5)));
        assert_eq!(parse_filter("done=true").unwrap(), ("done".to_string(), json!(true)));
        assert_eq!(parse_filter("name=Bench").unwrap(), ("name".to_string(), json!("Bench")));
        assert_eq!(parse_filter("name=\"5\"").unwrap(), ("name".to_string(), json!("5")));
        assert_eq!(parse_filter("note=a=b").unwrap(), ("note".to_string(), json!("a=b")));
    }

    #[test]
    fn test_parse_filter_rejects_malformed() {
        assert!(parse_filter("reps").is_err());
        assert!(parse_filter("=5").is_err());
    }

    #[tokio::test]
    async fn test_open_cache_reports_missing_fixture() {
        let err = open_cache(Path::new("/nonexistent/fixture.json"), &CacheConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read fixture"));
    }
}
