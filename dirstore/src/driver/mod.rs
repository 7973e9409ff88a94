use crate::error::{DirStoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The CRUD contract every backing store satisfies, so the layers above a
/// driver never need to know which store they talk to.
///
/// Missing documents are `Ok(None)`, never an error.
pub trait Driver {
    type Document;
    type Input;
    type Patch;

    /// Key separating this driver's entries in shared caches.
    fn namespace(&self) -> &str;

    /// Pass a caller-chosen id through, or generate a fresh one.
    fn id(&self, raw: Option<&str>) -> String;

    fn get(&self, id: &str) -> Result<Option<Self::Document>>;

    fn list(&self, query: &ListQuery) -> Result<ListResult<Self::Document>>;

    fn create(&self, doc: Self::Input) -> Result<Self::Document>;

    fn patch(&self, id: &str, patch: Self::Patch) -> Result<Option<Self::Document>>;

    fn remove(&self, id: &str) -> Result<Option<Self::Document>>;
}

/// A list query: field filters plus `$`-prefixed control keys such as
/// `$limit` and `$skip`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery(BTreeMap<String, serde_json::Value>);

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<String>) -> Self {
        Self::default().with("dir", serde_json::Value::String(dir.into()))
    }

    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(ListQuery(map.into_iter().collect())),
            serde_json::Value::Null => Ok(Self::default()),
            other => Err(DirStoreError::Validation(format!(
                "list query must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Non-control keys.
    pub fn filters(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter().filter(|(k, _)| !is_control(k))
    }

    /// Look up a control key by name, with or without its `$`.
    pub fn control(&self, name: &str) -> Option<&serde_json::Value> {
        let key = if is_control(name) {
            name.to_string()
        } else {
            format!("${name}")
        };
        self.0.get(&key)
    }
}

fn is_control(key: &str) -> bool {
    key.starts_with('$')
}

/// One page of a listing. `limit` is `-1` when the listing is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult<T> {
    pub total: usize,
    pub limit: i64,
    pub skip: usize,
    pub data: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn unbounded(data: Vec<T>) -> Self {
        ListResult {
            total: data.len(),
            limit: -1,
            skip: 0,
            data,
        }
    }

    pub fn empty() -> Self {
        Self::unbounded(Vec::new())
    }
}

/// Field types exposed to the validation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Text,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

pub type FieldSchema = BTreeMap<&'static str, FieldSpec>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_skip_controls() {
        let query = ListQuery::in_dir("foo")
            .with("$limit", json!(5))
            .with("$sort", json!({ "name": 1 }));

        let filters: Vec<_> = query.filters().map(|(k, _)| k.as_str()).collect();
        assert_eq!(filters, vec!["dir"]);
        assert_eq!(query.control("limit"), Some(&json!(5)));
        assert_eq!(query.control("$limit"), Some(&json!(5)));
        assert_eq!(query.control("skip"), None);
    }

    #[test]
    fn test_from_json() {
        let query = ListQuery::from_json(json!({ "dir": "a/b", "$skip": 2 })).unwrap();
        assert_eq!(query.get("dir"), Some(&json!("a/b")));
        assert_eq!(ListQuery::from_json(json!(null)).unwrap(), ListQuery::all());
        assert!(ListQuery::from_json(json!("dir")).is_err());
    }

    #[test]
    fn test_unbounded_result() {
        let result = ListResult::unbounded(vec![1, 2, 3]);
        assert_eq!(result.total, 3);
        assert_eq!(result.limit, -1);
        assert_eq!(result.skip, 0);

        let empty: ListResult<u8> = ListResult::empty();
        assert_eq!(empty.total, 0);
        assert!(empty.data.is_empty());
    }
}
