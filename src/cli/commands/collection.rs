//! `repsync get-collection`

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::{open_cache, parse_filter};
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::types::GetCollectionArgs;
use crate::domain::models::{CollectionQuery, Config, Direction};
use crate::services::CollectionOptions;

/// Result of `get-collection`.
#[derive(Debug, Serialize)]
pub struct CollectionOutput {
    /// Cache key the read went through.
    pub key: String,
    /// Number of records returned.
    pub total: usize,
    /// Records as `{ "id": .., ...fields }`.
    pub records: Vec<Value>,
}

impl CommandOutput for CollectionOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return format!("No documents for {}", self.key);
        }
        format!(
            "{} document(s) for {}\n{}",
            self.total,
            self.key,
            TableFormatter::new().format_records(&self.records)
        )
    }
}

/// Build the query described by the command-line flags.
pub fn build_query(args: &GetCollectionArgs) -> Result<CollectionQuery> {
    let mut query = CollectionQuery::new(args.path.trim_matches('/'));
    if let Some(field) = &args.order_by {
        let direction = if args.asc {
            Direction::Asc
        } else {
            Direction::Desc
        };
        query = query.order_by(field.clone(), direction);
    }
    for raw in &args.filters {
        let (field, value) = parse_filter(raw)?;
        query = query.where_equals(field, value);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    Ok(query)
}

/// Read the collection once through a fresh cache and print it.
pub async fn execute(args: GetCollectionArgs, config: &Config, json_mode: bool) -> Result<()> {
    let query = build_query(&args)?;
    let key = args.key.clone().unwrap_or_else(|| query.cache_key());
    let cache = open_cache(&args.fixture, &config.cache).await?;

    let records = cache
        .get_collection_data(&key, CollectionOptions::for_query(query))
        .await?;

    let out = CollectionOutput {
        key,
        total: records.len(),
        records,
    };
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(order_by: Option<&str>, asc: bool, filters: &[&str], limit: Option<usize>) -> GetCollectionArgs {
        GetCollectionArgs {
            fixture: PathBuf::from("fixture.json"),
            path: "/users/u1/workouts/".to_string(),
            order_by: order_by.map(str::to_string),
            asc,
            filters: filters.iter().map(|f| f.to_string()).collect(),
            limit,
            key: None,
        }
    }

    #[test]
    fn test_build_query_key() {
        let query = build_query(&args(Some("date"), true, &["done=true"], Some(3))).unwrap();
        assert_eq!(
            query.cache_key(),
            "collection:users/u1/workouts:date:asc:where:done:==:true|limit:::3"
        );
    }

    #[test]
    fn test_build_query_without_flags() {
        let query = build_query(&args(None, false, &[], None)).unwrap();
        assert_eq!(query.path, "users/u1/workouts");
        assert!(query.order_by.is_none());
        assert!(query.constraints.is_empty());
    }
}
