//! Translation between API-shaped records and storage rows.
//!
//! Every entity goes through the same two passes. JSON columns are encoded on
//! the way in and decoded on the way out. Renamed fields are then moved
//! between their camelCase API name and their snake_case column. What differs
//! per entity lives in a static [`MapperSpec`]; [`EntityKind`] picks it.

pub mod record;
pub mod spec;

use serde_json::Value;

use crate::error::ValidationError;

pub use record::{Record, from_record, to_record};
pub use spec::{Coerce, FieldRename, JsonField, MapperSpec, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Teacher,
    Class,
    Schedule,
}

impl EntityKind {
    pub fn spec(self) -> &'static MapperSpec {
        match self {
            EntityKind::Teacher => &spec::TEACHER,
            EntityKind::Class => &spec::CLASS,
            EntityKind::Schedule => &spec::SCHEDULE,
        }
    }

    pub fn table(self) -> &'static str {
        self.spec().table
    }
}

/// A record bound to the entity it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    kind: EntityKind,
    data: Record,
}

impl Mapper {
    pub fn new(kind: EntityKind, input: Option<Record>) -> Self {
        let mut data = input.unwrap_or_default();

        match kind {
            EntityKind::Teacher => {
                fill_missing(&mut data, "subjects", Value::Array(Vec::new()));
                fill_missing(&mut data, "availability", Value::Object(Record::new()));
            }
            EntityKind::Schedule => {
                let flag = match data.get("is_exam") {
                    Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {
                        Some(n.as_i64() != Some(0))
                    }
                    _ => None,
                };
                if let Some(flag) = flag {
                    data.insert("is_exam".to_string(), Value::Bool(flag));
                }
            }
            EntityKind::Class => {}
        }

        Self { kind, data }
    }

    pub fn teacher(input: Option<Record>) -> Self {
        Self::new(EntityKind::Teacher, input)
    }

    pub fn class(input: Option<Record>) -> Self {
        Self::new(EntityKind::Class, input)
    }

    pub fn schedule(input: Option<Record>) -> Self {
        Self::new(EntityKind::Schedule, input)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn table(&self) -> &'static str {
        self.kind.table()
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    /// Produces the storage row. Leaves `self` untouched.
    pub fn serialize(&self) -> Result<Record, ValidationError> {
        let spec = self.kind.spec();
        let mut result = encode_json_fields(spec.json_fields, &self.data)?;

        for rename in spec.renames {
            if let Some(value) = result.remove(rename.api) {
                let value = rename.coerce.to_store(rename.api, value)?;
                result.insert(rename.store.to_string(), value);
            } else if rename.coerce == Coerce::Flag {
                // No api key: the column is never introduced, only a bool
                // left by construction-time coercion is put back as 0/1.
                if let Some(&Value::Bool(flag)) = result.get(rename.store) {
                    result.insert(rename.store.to_string(), Value::from(i64::from(flag)));
                }
            }
        }

        Ok(result)
    }

    /// Turns a storage row back into the API shape.
    pub fn deserialize(&self, row: &Record) -> Result<Record, ValidationError> {
        let spec = self.kind.spec();
        let mut result = decode_json_fields(spec.json_fields, row)?;

        for rename in spec.renames {
            if let Some(value) = result.remove(rename.store) {
                let value = rename.coerce.to_api(rename.store, value)?;
                result.insert(rename.api.to_string(), value);
            }
        }

        Ok(result)
    }
}

fn fill_missing(data: &mut Record, field: &str, default: Value) {
    if matches!(data.get(field), None | Some(Value::Null)) {
        data.insert(field.to_string(), default);
    }
}

fn encode_json_fields(fields: &[JsonField], data: &Record) -> Result<Record, ValidationError> {
    let mut result = data.clone();

    for field in fields {
        let Some(value) = result.get_mut(field.name) else {
            continue;
        };

        // encoded on an earlier pass; the text must still decode to the right shape
        if let Value::String(text) = value {
            let decoded: Value = serde_json::from_str(text).map_err(|source| {
                ValidationError::MalformedJson {
                    field: field.name,
                    source,
                }
            })?;
            if !field.shape.matches(&decoded) {
                return Err(ValidationError::WrongShape {
                    field: field.name,
                    expected: field.shape.describe(),
                });
            }
            continue;
        }

        if !field.shape.matches(value) {
            return Err(ValidationError::WrongShape {
                field: field.name,
                expected: field.shape.describe(),
            });
        }

        *value = Value::String(value.to_string());
    }

    Ok(result)
}

fn decode_json_fields(fields: &[JsonField], row: &Record) -> Result<Record, ValidationError> {
    let mut result = row.clone();

    for field in fields {
        let Some(Value::String(text)) = result.get(field.name) else {
            continue;
        };

        let decoded: Value = serde_json::from_str(text).map_err(|source| {
            ValidationError::MalformedJson {
                field: field.name,
                source,
            }
        })?;

        if !field.shape.matches(&decoded) {
            return Err(ValidationError::WrongShape {
                field: field.name,
                expected: field.shape.describe(),
            });
        }

        result.insert(field.name.to_string(), decoded);
    }

    Ok(result)
}
