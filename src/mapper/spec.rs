use serde_json::Value;

use crate::error::ValidationError;

/// Expected in-memory shape of a column that is JSON text at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    StringList,
    Mapping,
}

impl Shape {
    pub fn describe(self) -> &'static str {
        match self {
            Shape::StringList => "a list of strings",
            Shape::Mapping => "a mapping",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Shape::StringList, Value::Array(items)) => items.iter().all(Value::is_string),
            (Shape::Mapping, Value::Object(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JsonField {
    pub name: &'static str,
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    Keep,
    /// API side holds a bool, storage side holds 0/1.
    Flag,
}

impl Coerce {
    pub fn to_store(self, field: &'static str, value: Value) -> Result<Value, ValidationError> {
        match self {
            Coerce::Keep => Ok(value),
            Coerce::Flag => Ok(Value::from(i64::from(truthy(field, &value)?))),
        }
    }

    pub fn to_api(self, field: &'static str, value: Value) -> Result<Value, ValidationError> {
        match self {
            Coerce::Keep => Ok(value),
            Coerce::Flag => Ok(Value::Bool(truthy(field, &value)?)),
        }
    }
}

fn truthy(field: &'static str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::Null => Ok(false),
        _ => Err(ValidationError::WrongShape {
            field,
            expected: "a boolean or 0/1",
        }),
    }
}

/// camelCase API name paired with its snake_case column.
#[derive(Debug, Clone, Copy)]
pub struct FieldRename {
    pub api: &'static str,
    pub store: &'static str,
    pub coerce: Coerce,
}

impl FieldRename {
    const fn plain(api: &'static str, store: &'static str) -> Self {
        Self { api, store, coerce: Coerce::Keep }
    }

    const fn flag(api: &'static str, store: &'static str) -> Self {
        Self { api, store, coerce: Coerce::Flag }
    }
}

/// Per-entity translation table.
#[derive(Debug)]
pub struct MapperSpec {
    pub table: &'static str,
    pub json_fields: &'static [JsonField],
    pub renames: &'static [FieldRename],
}

pub static TEACHER: MapperSpec = MapperSpec {
    table: "teachers",
    json_fields: &[
        JsonField { name: "subjects", shape: Shape::StringList },
        JsonField { name: "availability", shape: Shape::Mapping },
    ],
    renames: &[],
};

pub static CLASS: MapperSpec = MapperSpec {
    table: "classes",
    json_fields: &[],
    renames: &[],
};

pub static SCHEDULE: MapperSpec = MapperSpec {
    table: "schedule",
    json_fields: &[],
    renames: &[
        FieldRename::plain("startTime", "start_time"),
        FieldRename::plain("endTime", "end_time"),
        FieldRename::plain("teacherId", "teacher_id"),
        FieldRename::plain("className", "class_name"),
        FieldRename::flag("isExam", "is_exam"),
    ],
};
