//! Partial update translation.
//!
//! A partial update arrives as an ordered list of JSON-Patch style operations. This
//! module folds such a list into a single [`Update`] instruction made of a `set` map
//! and an `unset` set keyed by dotted field paths, which every backend can apply
//! atomically without replacing the whole document.
//!
//! Operations are applied in order with last-write-wins semantics. The resulting
//! instruction never contains two entries where one path is a prefix of the other,
//! so it is valid for stores that reject conflicting update paths.
//!
//! ```ignore
//! use restlayer_core::patch::{PatchOperation, Update};
//!
//! let ops: Vec<PatchOperation> = serde_json::from_value(serde_json::json!([
//!     { "op": "replace", "path": "/name", "value": "Bobby" },
//!     { "op": "remove", "path": "/email" },
//! ]))?;
//! let update = Update::from_patch(&ops)?;
//! ```

use std::collections::BTreeSet;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::json_to_bson,
    error::{DocumentStoreError, DocumentStoreResult},
    key::{KEY_FIELD, PUBLIC_KEY_FIELD},
};

/// The kind of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
    Copy,
    Move,
    Test,
}

/// One instruction of an ordered partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self { op: PatchOp::Replace, path: path.into(), value: Some(value) }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self { op: PatchOp::Add, path: path.into(), value: Some(value) }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self { op: PatchOp::Remove, path: path.into(), value: None }
    }
}

/// A store-native partial update: fields to set and fields to remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Dotted path to new value.
    pub set: Document,
    /// Dotted paths to remove.
    pub unset: BTreeSet<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if applying this update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Translates an ordered list of patch operations into a single update.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidPatch`] if the list is empty, uses an
    /// unsupported operation, has an empty or array-append path, targets the document
    /// key, or omits the value of an `add`/`replace`.
    pub fn from_patch(operations: &[PatchOperation]) -> DocumentStoreResult<Self> {
        if operations.is_empty() {
            return Err(DocumentStoreError::InvalidPatch("patch contains no operations".into()));
        }

        let mut update = Update::new();

        for operation in operations {
            let path = field_path(&operation.path)?;

            match operation.op {
                PatchOp::Add | PatchOp::Replace => {
                    let value = operation.value.clone().ok_or_else(|| {
                        DocumentStoreError::InvalidPatch(format!(
                            "{:?} at {} requires a value",
                            operation.op, operation.path
                        ))
                    })?;
                    update.set_path(&path, json_to_bson(value));
                }
                PatchOp::Remove => update.unset_path(&path),
                unsupported => {
                    return Err(DocumentStoreError::InvalidPatch(format!(
                        "unsupported operation {unsupported:?}"
                    )));
                }
            }
        }

        Ok(update)
    }

    /// Records that `path` is set to `value`, overriding earlier instructions.
    pub fn set_path(&mut self, path: &str, value: Bson) {
        self.discard_descendants(path);
        self.unset.remove(path);

        if let Some(ancestor) = ancestor_in(self.set.keys(), path) {
            let relative = &path[ancestor.len() + 1..];
            if let Some(Bson::Document(target)) = self.set.get_mut(&ancestor) {
                insert_nested(target, relative, value);
                return;
            }
            // The ancestor holds a scalar; setting beneath it rebuilds it as a document.
            let mut rebuilt = Document::new();
            insert_nested(&mut rebuilt, relative, value);
            self.set.insert(ancestor, rebuilt);
            return;
        }

        if let Some(ancestor) = ancestor_in(self.unset.iter(), path) {
            self.unset.remove(&ancestor);
            let mut rebuilt = Document::new();
            insert_nested(&mut rebuilt, &path[ancestor.len() + 1..], value);
            self.set.insert(ancestor, rebuilt);
            return;
        }

        self.set.insert(path, value);
    }

    /// Records that `path` is removed, overriding earlier instructions.
    pub fn unset_path(&mut self, path: &str) {
        self.discard_descendants(path);
        self.set.remove(path);

        if let Some(ancestor) = ancestor_in(self.set.keys(), path) {
            if let Some(Bson::Document(target)) = self.set.get_mut(&ancestor) {
                remove_nested(target, &path[ancestor.len() + 1..]);
            }
            return;
        }

        if ancestor_in(self.unset.iter(), path).is_some() {
            return;
        }

        self.unset.insert(path.to_string());
    }

    fn discard_descendants(&mut self, path: &str) {
        let prefix = format!("{path}.");
        let nested = self
            .set
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect::<Vec<_>>();

        for key in nested {
            self.set.remove(&key);
        }
        self.unset.retain(|k| !k.starts_with(&prefix));
    }
}

/// Normalizes a JSON pointer (`/a/b`) or dotted path (`a.b`) into a dotted field path.
pub fn field_path(path: &str) -> DocumentStoreResult<String> {
    let segments = match path.strip_prefix('/') {
        Some(pointer) => pointer
            .split('/')
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .collect::<Vec<_>>(),
        None => path.split('.').map(str::to_string).collect::<Vec<_>>(),
    };

    if segments.iter().any(|s| s.is_empty()) {
        return Err(DocumentStoreError::InvalidPatch(format!("invalid path '{path}'")));
    }
    if segments.iter().any(|s| s == "-") {
        return Err(DocumentStoreError::InvalidPatch(format!(
            "array append is not supported at '{path}'"
        )));
    }
    if segments[0] == KEY_FIELD || segments[0] == PUBLIC_KEY_FIELD {
        return Err(DocumentStoreError::InvalidPatch("the document key cannot be patched".into()));
    }

    Ok(segments.join("."))
}

fn ancestor_in<'a>(paths: impl Iterator<Item = &'a String>, path: &str) -> Option<String> {
    paths
        .filter(|candidate| {
            path.len() > candidate.len()
                && path.starts_with(candidate.as_str())
                && path.as_bytes()[candidate.len()] == b'.'
        })
        .min_by_key(|candidate| candidate.len())
        .cloned()
}

fn insert_nested(target: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            target.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(target.get(head), Some(Bson::Document(_))) {
                target.insert(head, Document::new());
            }
            if let Some(Bson::Document(child)) = target.get_mut(head) {
                insert_nested(child, rest, value);
            }
        }
    }
}

fn remove_nested(target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            target.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = target.get_mut(head) {
                remove_nested(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    fn ops(value: Value) -> Vec<PatchOperation> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn translates_replace_and_remove() {
        let update = Update::from_patch(&ops(json!([
            { "op": "replace", "path": "/name", "value": "Bobby" },
            { "op": "add", "path": "/address/city", "value": "Paris" },
            { "op": "remove", "path": "/email" },
        ])))
        .unwrap();

        assert_eq!(update.set, doc! { "name": "Bobby", "address.city": "Paris" });
        assert_eq!(update.unset.into_iter().collect::<Vec<_>>(), vec!["email"]);
    }

    #[test]
    fn later_operations_win_on_the_same_path() {
        let update = Update::from_patch(&ops(json!([
            { "op": "replace", "path": "/name", "value": "Bob" },
            { "op": "remove", "path": "/name" },
            { "op": "remove", "path": "/email" },
            { "op": "add", "path": "/email", "value": "bob@example.com" },
            { "op": "replace", "path": "/name", "value": "Robert" },
        ])))
        .unwrap();

        assert_eq!(update.set, doc! { "email": "bob@example.com", "name": "Robert" });
        assert!(update.unset.is_empty());
    }

    #[test]
    fn nested_paths_fold_into_set_ancestors() {
        let update = Update::from_patch(&ops(json!([
            { "op": "add", "path": "/address", "value": { "city": "Paris", "zip": "75001" } },
            { "op": "replace", "path": "/address/city", "value": "Lyon" },
            { "op": "remove", "path": "/address/zip" },
        ])))
        .unwrap();

        assert_eq!(update.set, doc! { "address": { "city": "Lyon" } });
        assert!(update.unset.is_empty());
    }

    #[test]
    fn setting_beneath_a_removed_ancestor_rebuilds_it() {
        let update = Update::from_patch(&ops(json!([
            { "op": "remove", "path": "/address" },
            { "op": "add", "path": "/address/city", "value": "Paris" },
        ])))
        .unwrap();

        assert_eq!(update.set, doc! { "address": { "city": "Paris" } });
        assert!(update.unset.is_empty());
    }

    #[test]
    fn replacing_an_ancestor_discards_descendants() {
        let update = Update::from_patch(&ops(json!([
            { "op": "replace", "path": "/address/city", "value": "Paris" },
            { "op": "remove", "path": "/address/zip" },
            { "op": "replace", "path": "/address", "value": "unknown" },
        ])))
        .unwrap();

        assert_eq!(update.set, doc! { "address": "unknown" });
        assert!(update.unset.is_empty());
    }

    #[test]
    fn accepts_dotted_and_escaped_paths() {
        assert_eq!(field_path("address.city").unwrap(), "address.city");
        assert_eq!(field_path("/a~1b/c~0d").unwrap(), "a/b.c~d");
        assert_eq!(field_path("/tags/0").unwrap(), "tags.0");
    }

    #[test]
    fn rejects_malformed_patches() {
        assert!(Update::from_patch(&[]).is_err());
        assert!(Update::from_patch(&[PatchOperation::remove("")]).is_err());
        assert!(Update::from_patch(&[PatchOperation::remove("/")]).is_err());
        assert!(Update::from_patch(&[PatchOperation::add("/tags/-", json!("x"))]).is_err());
        assert!(Update::from_patch(&[PatchOperation::replace("/id", json!("x"))]).is_err());
        assert!(Update::from_patch(&[PatchOperation::replace("/_id", json!("x"))]).is_err());
        assert!(
            Update::from_patch(&ops(json!([{ "op": "replace", "path": "/name" }]))).is_err()
        );
        assert!(
            Update::from_patch(&ops(json!([{ "op": "test", "path": "/name", "value": 1 }])))
                .is_err()
        );
    }
}
