//! `repsync stats`

use anyhow::Result;
use serde::Serialize;

use super::open_cache;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::types::StatsArgs;
use crate::domain::models::{CollectionQuery, Config, DocumentRef};
use crate::services::{CacheStats, CollectionOptions, DocumentOptions};

/// One cache entry in the `stats` report.
#[derive(Debug, Serialize)]
pub struct EntryOutput {
    /// Cache key.
    pub key: String,
    /// Registered listeners on the entry.
    pub listeners: Option<usize>,
}

/// Report printed by `stats`.
#[derive(Debug, Serialize)]
pub struct StatsOutput {
    /// Counters across both registries.
    pub stats: CacheStats,
    /// Collection entries first, then document entries.
    pub entries: Vec<EntryOutput>,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let keys: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.listeners))
            .collect();
        TableFormatter::new().format_stats(&self.stats, &keys)
    }
}

/// Subscribe to the requested paths and print cache introspection.
pub async fn execute(args: StatsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let cache = open_cache(&args.fixture, &config.cache).await?;

    // Subscriptions stay alive until the report is built.
    let mut subscriptions = Vec::new();
    for path in &args.collections {
        let query = CollectionQuery::new(path.trim_matches('/'));
        subscriptions.push(cache.subscribe_to_collection(
            &query.cache_key(),
            CollectionOptions::for_query(query),
            |_| {},
        )?);
    }
    for path in &args.documents {
        let reference = DocumentRef::new(path.trim_matches('/'));
        subscriptions.push(cache.subscribe_to_document(
            &reference.cache_key(),
            DocumentOptions::for_ref(reference),
            |_| {},
        )?);
    }

    let entries = cache
        .collection_keys()
        .into_iter()
        .map(|key| EntryOutput {
            listeners: cache.collection_listener_count(&key),
            key,
        })
        .chain(cache.document_keys().into_iter().map(|key| EntryOutput {
            listeners: cache.document_listener_count(&key),
            key,
        }))
        .collect();

    let out = StatsOutput {
        stats: cache.stats(),
        entries,
    };
    output(&out, json_mode);

    drop(subscriptions);
    cache.clear();
    Ok(())
}
