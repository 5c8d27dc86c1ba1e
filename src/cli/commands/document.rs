//! `repsync get-document`

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::open_cache;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::types::GetDocumentArgs;
use crate::domain::models::{Config, DocumentRef};
use crate::services::DocumentOptions;

/// Result of `get-document`.
#[derive(Debug, Serialize)]
pub struct DocumentOutput {
    /// Cache key the read went through.
    pub key: String,
    /// Whether the document exists.
    pub exists: bool,
    /// The document as `{ "id": .., ...fields }`.
    pub record: Option<Value>,
}

impl CommandOutput for DocumentOutput {
    fn to_human(&self) -> String {
        match &self.record {
            Some(record) => format!(
                "{}\n{}",
                self.key,
                TableFormatter::new().format_record(record)
            ),
            None => format!("Document not found: {}", self.key),
        }
    }
}

/// Read the document once through a fresh cache and print it.
pub async fn execute(args: GetDocumentArgs, config: &Config, json_mode: bool) -> Result<()> {
    let path = args.path.trim_matches('/');
    if !path.contains('/') {
        anyhow::bail!("Document path '{path}' must look like collection/docId");
    }
    let reference = DocumentRef::new(path);
    let key = args.key.clone().unwrap_or_else(|| reference.cache_key());
    let cache = open_cache(&args.fixture, &config.cache).await?;

    let record = cache
        .get_document_data(&key, DocumentOptions::for_ref(reference))
        .await?;

    let out = DocumentOutput {
        key,
        exists: record.is_some(),
        record,
    };
    output(&out, json_mode);
    Ok(())
}
