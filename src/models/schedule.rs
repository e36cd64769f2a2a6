use serde::{Deserialize, Serialize};

/// One lesson slot. `class_name` is a free string, not a key into `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub teacher_id: String,
    pub class_name: String,
    pub subject: String,
    #[serde(default)]
    pub is_exam: bool,
    #[serde(default)]
    pub week: Option<i64>,
}
