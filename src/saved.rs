//! The flat, run-length-compressed on-disk/on-wire representation produced
//! by [`crate::list::IdentifierList::save`] and consumed by
//! [`crate::list::IdentifierList::load`].

use std::sync::Arc;

/// One run of identifiers under `bunch_id`, all sharing `is_deleted`.
///
/// `save` always emits these maximally merged and in list order; `load`
/// accepts them in any grouping (merged or not) but rejects overlapping
/// `(bunchId, counter)` ranges, since two records could otherwise disagree
/// about whether the same identifier is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecord {
    pub bunch_id: Arc<str>,
    pub start_counter: u64,
    pub count: u64,
    pub is_deleted: bool,
}

#[cfg(feature = "json")]
pub use json::{from_json, to_json, JsonError};

#[cfg(feature = "json")]
mod json {
    use super::SavedRecord;
    use std::fmt;
    use std::sync::Arc;

    /// Encodes saved records the way callers typically transport this list
    /// over the wire: a JSON array of
    /// `{bunchId, startCounter, count, isDeleted}` objects, in list order.
    pub fn to_json(records: &[SavedRecord]) -> serde_json::Value {
        serde_json::Value::Array(
            records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "bunchId": r.bunch_id.as_ref(),
                        "startCounter": r.start_counter,
                        "count": r.count,
                        "isDeleted": r.is_deleted,
                    })
                })
                .collect(),
        )
    }

    /// The inverse of [`to_json`]. Walks the `serde_json::Value` tree by
    /// hand rather than deriving `Deserialize`, so a malformed entry reports
    /// which field was missing or mistyped instead of a generic parse error.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum JsonError {
        NotAnArray,
        MissingField(&'static str),
        WrongType(&'static str),
    }

    impl fmt::Display for JsonError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                JsonError::NotAnArray => write!(f, "expected a JSON array of saved records"),
                JsonError::MissingField(name) => write!(f, "saved record is missing field {name:?}"),
                JsonError::WrongType(name) => {
                    write!(f, "saved record field {name:?} has the wrong type")
                }
            }
        }
    }

    impl std::error::Error for JsonError {}

    pub fn from_json(value: &serde_json::Value) -> Result<Vec<SavedRecord>, JsonError> {
        let entries = value.as_array().ok_or(JsonError::NotAnArray)?;
        entries
            .iter()
            .map(|entry| {
                let bunch_id = entry
                    .get("bunchId")
                    .ok_or(JsonError::MissingField("bunchId"))?
                    .as_str()
                    .ok_or(JsonError::WrongType("bunchId"))?;
                let start_counter = entry
                    .get("startCounter")
                    .ok_or(JsonError::MissingField("startCounter"))?
                    .as_u64()
                    .ok_or(JsonError::WrongType("startCounter"))?;
                let count = entry
                    .get("count")
                    .ok_or(JsonError::MissingField("count"))?
                    .as_u64()
                    .ok_or(JsonError::WrongType("count"))?;
                let is_deleted = entry
                    .get("isDeleted")
                    .ok_or(JsonError::MissingField("isDeleted"))?
                    .as_bool()
                    .ok_or(JsonError::WrongType("isDeleted"))?;
                Ok(SavedRecord {
                    bunch_id: Arc::from(bunch_id),
                    start_counter,
                    count,
                    is_deleted,
                })
            })
            .collect()
    }

}
