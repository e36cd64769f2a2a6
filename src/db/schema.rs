/// Static description of one table. Column names cannot be bound as
/// parameters, so every record key is checked against `columns` first.
#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub key: &'static str,
    pub columns: &'static [&'static str],
}

impl TableDef {
    pub fn lookup(name: &str) -> Option<&'static TableDef> {
        TABLES.iter().copied().find(|t| t.name == name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

pub static TEACHERS: TableDef = TableDef {
    name: "teachers",
    key: "id",
    columns: &["id", "name", "subjects", "availability"],
};

pub static CLASSES: TableDef = TableDef {
    name: "classes",
    key: "id",
    columns: &["id", "name"],
};

pub static CLASS_SUBJECT_REQUIREMENTS: TableDef = TableDef {
    name: "class_subject_requirements",
    key: "id",
    columns: &["id", "class_id", "subject", "hours_per_week"],
};

pub static SCHEDULE: TableDef = TableDef {
    name: "schedule",
    key: "id",
    columns: &[
        "id",
        "day",
        "start_time",
        "end_time",
        "teacher_id",
        "class_name",
        "subject",
        "is_exam",
        "week",
    ],
};

static TABLES: [&TableDef; 4] = [&TEACHERS, &CLASSES, &CLASS_SUBJECT_REQUIREMENTS, &SCHEDULE];
