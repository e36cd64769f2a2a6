use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::schema::CLASS_SUBJECT_REQUIREMENTS;
use crate::db::{Operation, StorageGateway, Write};
use crate::error::AppError;
use crate::mapper::{EntityKind, Mapper, Record, from_record, to_record};
use crate::models::{
    Class, ClassName, NewClassRequest, NewTeacherRequest, RequirementRow, ScheduleEntry,
    SubjectRequirement, Teacher, UpdateClassRequest,
};

fn id_record(id: &str) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(id));
    record
}

/// API record -> mapper -> storage row -> gateway.
async fn store(
    db: &dyn StorageGateway,
    kind: EntityKind,
    operation: Operation,
    record: Record,
) -> Result<Option<Record>, AppError> {
    let mapper = Mapper::new(kind, Some(record));
    let row = mapper.serialize()?;
    db.execute(mapper.table(), operation, &row).await
}

fn load<T: DeserializeOwned>(kind: EntityKind, row: &Record) -> Result<T, AppError> {
    let record = Mapper::new(kind, None).deserialize(row)?;
    Ok(from_record(record)?)
}

fn storage_row<T: Serialize>(kind: EntityKind, item: &T) -> Result<Record, AppError> {
    let mapper = Mapper::new(kind, Some(to_record(item)?));
    Ok(mapper.serialize()?)
}

fn storage_rows<T: Serialize>(kind: EntityKind, items: &[T]) -> Result<Vec<Record>, AppError> {
    items.iter().map(|item| storage_row(kind, item)).collect()
}

pub async fn fetch_teachers(db: &dyn StorageGateway) -> Result<Vec<Teacher>, AppError> {
    let rows = db.fetch_all(EntityKind::Teacher.table()).await?;
    debug!("fetched {} teachers", rows.len());
    rows.iter().map(|row| load(EntityKind::Teacher, row)).collect()
}

pub async fn insert_teacher(
    db: &dyn StorageGateway,
    req: NewTeacherRequest,
) -> Result<Teacher, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let id = req
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let existing = db
        .fetch_where(EntityKind::Teacher.table(), "id", &Value::from(id.as_str()))
        .await?;
    if !existing.is_empty() {
        return Err(AppError::Conflict("Teacher id already exists".to_string()));
    }

    let mut record = to_record(&req)?;
    record.insert("id".to_string(), Value::from(id.as_str()));

    let row = store(db, EntityKind::Teacher, Operation::Insert, record)
        .await?
        .ok_or(AppError::InternalServerError)?;

    info!("created teacher {}", id);
    load(EntityKind::Teacher, &row)
}

pub async fn update_teacher(
    db: &dyn StorageGateway,
    id: &str,
    req: NewTeacherRequest,
) -> Result<Option<Teacher>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let mut record = to_record(&req)?;
    record.insert("id".to_string(), Value::from(id));

    match store(db, EntityKind::Teacher, Operation::Update, record).await? {
        Some(row) => {
            info!("updated teacher {}", id);
            Ok(Some(load(EntityKind::Teacher, &row)?))
        }
        None => Ok(None),
    }
}

pub async fn delete_teacher(db: &dyn StorageGateway, id: &str) -> Result<bool, AppError> {
    let deleted = db
        .execute(EntityKind::Teacher.table(), Operation::Delete, &id_record(id))
        .await?;
    if deleted.is_some() {
        info!("deleted teacher {}", id);
    }
    Ok(deleted.is_some())
}

async fn fetch_requirements(
    db: &dyn StorageGateway,
    class_id: &str,
) -> Result<Vec<SubjectRequirement>, AppError> {
    let rows = db
        .fetch_where(CLASS_SUBJECT_REQUIREMENTS.name, "class_id", &Value::from(class_id))
        .await?;

    rows.into_iter()
        .map(|row| -> Result<SubjectRequirement, AppError> {
            let row: RequirementRow = from_record(row)?;
            Ok(SubjectRequirement::from(row))
        })
        .collect()
}

/// Drops the class's requirement rows and inserts `reqs` in their place.
fn requirement_writes(
    class_id: &str,
    reqs: Vec<SubjectRequirement>,
) -> Result<Vec<Write>, AppError> {
    let mut writes = vec![Write::DeleteWhere {
        table: CLASS_SUBJECT_REQUIREMENTS.name,
        column: "class_id",
        value: Value::from(class_id),
    }];

    for req in reqs {
        writes.push(Write::Insert {
            table: CLASS_SUBJECT_REQUIREMENTS.name,
            record: to_record(&RequirementRow::new(class_id, req))?,
        });
    }
    Ok(writes)
}

async fn with_requirements(db: &dyn StorageGateway, class: ClassName) -> Result<Class, AppError> {
    let subject_requirements = fetch_requirements(db, &class.id).await?;
    Ok(Class {
        id: class.id,
        name: class.name,
        subject_requirements,
    })
}

async fn find_class(db: &dyn StorageGateway, id: &str) -> Result<Option<ClassName>, AppError> {
    let rows = db
        .fetch_where(EntityKind::Class.table(), "id", &Value::from(id))
        .await?;
    rows.first().map(|row| load(EntityKind::Class, row)).transpose()
}

pub async fn fetch_class_names(db: &dyn StorageGateway) -> Result<Vec<ClassName>, AppError> {
    let rows = db.fetch_all(EntityKind::Class.table()).await?;
    rows.iter().map(|row| load(EntityKind::Class, row)).collect()
}

pub async fn fetch_classes(db: &dyn StorageGateway) -> Result<Vec<Class>, AppError> {
    let names = fetch_class_names(db).await?;
    debug!("fetched {} classes", names.len());

    let mut classes = Vec::with_capacity(names.len());
    for class in names {
        classes.push(with_requirements(db, class).await?);
    }
    Ok(classes)
}

pub async fn insert_class(
    db: &dyn StorageGateway,
    req: NewClassRequest,
) -> Result<Class, AppError> {
    let Some(reqs) = req.subject_requirements else {
        return Err(AppError::BadRequest("Missing or invalid fields".to_string()));
    };
    if req.id.is_empty() || req.name.is_empty() {
        return Err(AppError::BadRequest("Missing or invalid fields".to_string()));
    }

    let same_name = db
        .fetch_where(EntityKind::Class.table(), "name", &Value::from(req.name.as_str()))
        .await?;
    if !same_name.is_empty() {
        return Err(AppError::Conflict("Class name already exists".to_string()));
    }
    if find_class(db, &req.id).await?.is_some() {
        return Err(AppError::Conflict("Class id already exists".to_string()));
    }

    let class = ClassName {
        id: req.id,
        name: req.name,
    };
    let mut writes = vec![Write::Insert {
        table: EntityKind::Class.table(),
        record: storage_row(EntityKind::Class, &class)?,
    }];
    writes.extend(requirement_writes(&class.id, reqs)?);
    db.write_all(&writes).await?;

    info!("created class {}", class.id);
    with_requirements(db, class).await
}

pub async fn update_class(
    db: &dyn StorageGateway,
    id: &str,
    req: UpdateClassRequest,
) -> Result<Option<Class>, AppError> {
    let Some(current) = find_class(db, id).await? else {
        return Ok(None);
    };

    let mut writes = Vec::new();
    let class = match req.name {
        Some(name) => {
            let update = ClassName {
                id: current.id,
                name,
            };
            writes.push(Write::Update {
                table: EntityKind::Class.table(),
                record: storage_row(EntityKind::Class, &update)?,
            });
            update
        }
        None => current,
    };
    if let Some(reqs) = req.subject_requirements {
        writes.extend(requirement_writes(id, reqs)?);
    }

    if !writes.is_empty() {
        db.write_all(&writes).await?;
    }

    info!("updated class {}", id);
    Ok(Some(with_requirements(db, class).await?))
}

pub async fn replace_requirements(
    db: &dyn StorageGateway,
    id: &str,
    reqs: Vec<SubjectRequirement>,
) -> Result<Option<Class>, AppError> {
    update_class(
        db,
        id,
        UpdateClassRequest {
            name: None,
            subject_requirements: Some(reqs),
        },
    )
    .await
}

pub async fn delete_class(db: &dyn StorageGateway, id: &str) -> Result<bool, AppError> {
    let writes = [
        Write::DeleteWhere {
            table: CLASS_SUBJECT_REQUIREMENTS.name,
            column: "class_id",
            value: Value::from(id),
        },
        Write::DeleteWhere {
            table: EntityKind::Class.table(),
            column: "id",
            value: Value::from(id),
        },
    ];
    let affected = db.write_all(&writes).await?;

    let deleted = affected.last().is_some_and(|rows| *rows > 0);
    if deleted {
        info!("deleted class {}", id);
    }
    Ok(deleted)
}

pub async fn fetch_schedule(db: &dyn StorageGateway) -> Result<Vec<ScheduleEntry>, AppError> {
    let rows = db.fetch_all(EntityKind::Schedule.table()).await?;
    debug!("fetched {} schedule entries", rows.len());
    rows.iter().map(|row| load(EntityKind::Schedule, row)).collect()
}

/// Drops every stored slot and writes `entries` in their place.
pub async fn replace_schedule(
    db: &dyn StorageGateway,
    entries: &[ScheduleEntry],
) -> Result<usize, AppError> {
    let rows = storage_rows(EntityKind::Schedule, entries)?;
    db.replace_all(EntityKind::Schedule.table(), &rows).await?;
    info!("replaced schedule with {} entries", rows.len());
    Ok(rows.len())
}

pub async fn save_schedule(
    db: &dyn StorageGateway,
    entries: &[ScheduleEntry],
) -> Result<usize, AppError> {
    if entries.is_empty() {
        return Err(AppError::BadRequest("No schedule data provided".to_string()));
    }
    replace_schedule(db, entries).await
}
