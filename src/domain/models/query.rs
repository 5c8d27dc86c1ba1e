//! Live query descriptors and their default cache keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Sort direction for an ordered collection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("Invalid direction: {other}. Must be one of: asc, desc")),
        }
    }
}

/// Ordering of a collection query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A single query constraint applied after ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Keep documents whose `field` equals `value`.
    WhereEquals {
        /// Top-level field name.
        field: String,
        /// Value the field must equal.
        value: Value,
    },
    /// Keep at most `count` documents.
    Limit {
        /// Maximum number of documents.
        count: usize,
    },
}

impl Constraint {
    fn cache_key(&self) -> String {
        match self {
            Self::WhereEquals { field, value } => format!("where:{field}:==:{value}"),
            Self::Limit { count } => format!("limit:::{count}"),
        }
    }
}

/// Descriptor of a live collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// Collection path.
    pub path: String,
    /// Ordering, if any.
    pub order_by: Option<OrderBy>,
    /// Filters and limits in the order they were added.
    pub constraints: Vec<Constraint>,
}

impl CollectionQuery {
    /// Unfiltered, unordered query over `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order_by: None,
            constraints: Vec::new(),
        }
    }

    /// Order by `field`.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Add an equality filter.
    pub fn where_equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.push(Constraint::WhereEquals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Cap the number of documents.
    pub fn limit(mut self, count: usize) -> Self {
        self.constraints.push(Constraint::Limit { count });
        self
    }

    /// Default cache key: `collection:{path}:{field}:{dir}:{c1|c2|..}`.
    ///
    /// Two queries with the same key are treated as the same logical
    /// query by the cache.
    pub fn cache_key(&self) -> String {
        let (field, direction) = match &self.order_by {
            Some(order) => (order.field.as_str(), order.direction.to_string()),
            None => ("", String::new()),
        };
        let constraints = self
            .constraints
            .iter()
            .map(Constraint::cache_key)
            .collect::<Vec<_>>()
            .join("|");
        format!("collection:{}:{field}:{direction}:{constraints}", self.path)
    }
}

/// Descriptor of a single live document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Full document path.
    pub path: String,
}

impl DocumentRef {
    /// Reference to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Reference to `{collection}/{id}`.
    pub fn child(collection: &str, id: &str) -> Self {
        Self::new(format!("{}/{id}", collection.trim_end_matches('/')))
    }

    /// Document id (last path segment).
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Path of the collection that holds this document.
    pub fn collection_path(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
    }

    /// Default cache key: `document:{path}`.
    pub fn cache_key(&self) -> String {
        format!("document:{}", self.path)
    }
}
