//! Keyed set difference over embedded campaign lists.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CascadeError, CascadeResult};

/// Which serialized fields decide whether two elements are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    /// Every field participates.
    Whole,
    /// Only the named fields participate; a missing field compares as null.
    Fields(&'a [&'a str]),
}

pub const PRODUCT_GROUP_IDENTITY: Identity<'static> =
    Identity::Fields(&["product_group_id"]);

pub const WINDOW_IDENTITY: Identity<'static> =
    Identity::Fields(&["landing_page_id", "start_date", "end_date"]);

fn identity_key<T: Serialize>(
    element: &T,
    identity: Identity<'_>,
) -> CascadeResult<String> {
    let value = serde_json::to_value(element)
        .map_err(|e| CascadeError::decode("list element", e))?;
    let key = match identity {
        // serde_json maps are ordered by key, so this is canonical
        Identity::Whole => value,
        Identity::Fields(fields) => Value::Array(
            fields
                .iter()
                .map(|f| value.get(*f).cloned().unwrap_or(Value::Null))
                .collect(),
        ),
    };
    Ok(key.to_string())
}

/// Elements of `base` with no counterpart in `change` under `identity`, in
/// `base` order. Duplicates in `base` are reported once per occurrence.
pub fn difference<'b, T: Serialize>(
    base: &'b [T],
    change: &[T],
    identity: Identity<'_>,
) -> CascadeResult<Vec<&'b T>> {
    let present = change
        .iter()
        .map(|e| identity_key(e, identity))
        .collect::<CascadeResult<HashSet<_>>>()?;
    let mut missing = Vec::new();
    for element in base {
        if !present.contains(&identity_key(element, identity)?) {
            missing.push(element);
        }
    }
    Ok(missing)
}

/// Both directions at once: `(removed, added)` going from `before` to
/// `after`.
pub fn changes<'b, T: Serialize>(
    before: &'b [T],
    after: &'b [T],
    identity: Identity<'_>,
) -> CascadeResult<(Vec<&'b T>, Vec<&'b T>)> {
    Ok((
        difference(before, after, identity)?,
        difference(after, before, identity)?,
    ))
}
