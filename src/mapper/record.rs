use serde::{Serialize, de::DeserializeOwned, ser::Error as _};
use serde_json::{Map, Value};

/// One row of one entity, keyed by field name. Used for both the API shape
/// and the storage shape.
pub type Record = Map<String, Value>;

/// Converts a typed model into a record. Fails on types that are not
/// serialized as a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde_json::Error::custom(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(record))
}
