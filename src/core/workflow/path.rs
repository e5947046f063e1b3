//! Dot-delimited path access into nested JSON objects.
//!
//! A miss is never an error: `get` answers `None` as soon as a segment is missing, a node is
//! not an object, or the value found is `null`.

use serde_json::{Map, Value};

const SEPARATOR: char = '.';

/// Reads and writes values in nested `serde_json` objects using dotted paths.
pub struct PathResolver;

impl PathResolver {
    /// Look up `path` in `container`.
    pub fn get<'a>(container: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
        if path.trim().is_empty() {
            return None;
        }
        let mut segments = path.split(SEPARATOR);
        let first = segments.next()?;
        let mut current = container.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Assign `value` at `path`, creating intermediate objects where a segment is missing or
    /// holds a non-object value.
    pub fn set(container: &mut Map<String, Value>, path: &str, value: Value) {
        let segments: Vec<&str> = path.split(SEPARATOR).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = container;
        for segment in parents {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            current = map;
        }
        current.insert((*last).to_string(), value);
    }
}
