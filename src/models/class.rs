use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject_requirements: Vec<SubjectRequirement>,
}

/// Only `id` and `name`, as listed by `/api/classes/names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequirement {
    pub subject: String,
    pub hours_per_week: i64,
}

/// Storage shape of `class_subject_requirements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub class_id: String,
    pub subject: String,
    pub hours_per_week: i64,
}

impl RequirementRow {
    pub fn new(class_id: &str, req: SubjectRequirement) -> Self {
        Self {
            id: None,
            class_id: class_id.to_string(),
            subject: req.subject,
            hours_per_week: req.hours_per_week,
        }
    }
}

impl From<RequirementRow> for SubjectRequirement {
    fn from(row: RequirementRow) -> Self {
        Self {
            subject: row.subject,
            hours_per_week: row.hours_per_week,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClassRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub subject_requirements: Option<Vec<SubjectRequirement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    pub subject_requirements: Option<Vec<SubjectRequirement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsRequest {
    pub subject_requirements: Vec<SubjectRequirement>,
}
