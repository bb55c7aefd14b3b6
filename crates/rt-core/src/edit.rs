//! In-place edits of one array field of a stored document.

use crate::error::{AppError, Result};
use serde_json::{Map, Value};

/// Set-like change to an array field: `Add` appends unless an equal
/// element is present, `Remove` drops every equal element.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayEdit {
    Add(Value),
    Remove(Value),
}

impl ArrayEdit {
    /// Applies the edit to `field` of `doc`. A missing document or field
    /// starts out as an empty array. Returns the new document and whether
    /// the array changed.
    pub fn apply(&self, doc: Option<Value>, field: &str) -> Result<(Value, bool)> {
        let mut object = match doc {
            Some(Value::Object(object)) => object,
            Some(_) => return Err(AppError::StoreWriteFailed(format!("cannot edit {field}: document is not an object"))),
            None => Map::new(),
        };
        let slot = object.entry(field).or_insert(Value::Null);
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        let Value::Array(array) = slot else {
            return Err(AppError::StoreWriteFailed(format!("cannot edit {field}: not an array")));
        };

        let changed = match self {
            ArrayEdit::Add(value) => {
                let absent = !array.contains(value);
                if absent {
                    array.push(value.clone());
                }
                absent
            }
            ArrayEdit::Remove(value) => {
                let before = array.len();
                array.retain(|v| v != value);
                before != array.len()
            }
        };
        Ok((Value::Object(object), changed))
    }
}
