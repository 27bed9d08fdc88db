use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire envelope of one fragment: `{ "index": 0, "data": "...", "isLast": false }`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Chunk {
    pub index: u32,
    pub data: String,
    pub is_last: bool,
}

impl Chunk {
    pub fn new(index: u32, data: impl Into<String>, is_last: bool) -> Self {
        Self {
            index,
            data: data.into(),
            is_last,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Returns `None` when the value is not a chunk envelope.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}
