//! Dotted field path access on documents.
//!
//! Paths such as `address.city` descend through embedded documents. A numeric
//! segment (`tags.0`) indexes into an array.

use bson::{Bson, Document};

use restlayer_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    key::KEY_FIELD,
    query::Projection,
};

/// Looks up the value at `path`.
pub(crate) fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Sets the value at `path`, creating intermediate documents as needed.
///
/// An array index may address an existing element or the position just past the end,
/// which appends.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidPatch`] if an intermediate value is neither a
/// document nor an array, or if an index lies beyond the end of its array.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(child) => set_in_value(child, rest, value, path),
                None => Ok(()),
            }
        }
    }
}

fn set_in_value(target: &mut Bson, path: &str, value: Bson, full: &str) -> DocumentStoreResult<()> {
    match target {
        Bson::Document(inner) => set_path(inner, path, value),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let index = head.parse::<usize>().map_err(|_| {
                DocumentStoreError::InvalidPatch(format!("'{head}' is not an array index in '{full}'"))
            })?;

            if index > items.len() {
                return Err(DocumentStoreError::InvalidPatch(format!(
                    "index {index} is past the end of a {}-element array in '{full}'",
                    items.len()
                )));
            }
            if index == items.len() {
                items.push(Bson::Null);
            }

            match rest {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => {
                    if matches!(items[index], Bson::Null) {
                        items[index] = Bson::Document(Document::new());
                    }
                    set_in_value(&mut items[index], rest, value, full)
                }
            }
        }
        _ => Err(DocumentStoreError::InvalidPatch(format!(
            "cannot create field beneath a scalar value in '{full}'"
        ))),
    }
}

/// Removes the value at `path`. Missing paths are ignored.
///
/// Removing an array element replaces it with null, keeping the other indices stable.
pub(crate) fn remove_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = document.get_mut(head) {
                remove_in_value(child, rest);
            }
        }
    }
}

fn remove_in_value(target: &mut Bson, path: &str) {
    match target {
        Bson::Document(inner) => remove_path(inner, path),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let Ok(index) = head.parse::<usize>() else {
                return;
            };
            match (items.get_mut(index), rest) {
                (Some(item), None) => *item = Bson::Null,
                (Some(item), Some(rest)) => remove_in_value(item, rest),
                (None, _) => {}
            }
        }
        _ => {}
    }
}

/// Applies a projection, always keeping the key field.
pub(crate) fn project(document: &Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => {
            let mut projected = Document::new();

            if let Some(key) = document.get(KEY_FIELD) {
                projected.insert(KEY_FIELD, key.clone());
            }
            for field in fields {
                if let Some(value) = get_path(document, field) {
                    // Paths through arrays cannot be rebuilt as documents; they are skipped.
                    let _ = set_path(&mut projected, field, value.clone());
                }
            }

            projected
        }
        Projection::Exclude(fields) => {
            let mut projected = document.clone();

            for field in fields.iter().filter(|f| f.as_str() != KEY_FIELD) {
                remove_path(&mut projected, field);
            }

            projected
        }
    }
}
