use serde_json::{Value, json};
use sqlx::SqlitePool;
use timetable::db::{self, Operation, SqliteGateway, StorageGateway, Write};
use timetable::error::AppError;
use timetable::mapper::{Mapper, Record};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

async fn setup() -> (SqlitePool, SqliteGateway) {
    // a single connection, so every query sees the same in-memory database
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    let gateway = SqliteGateway::new(pool.clone());
    (pool, gateway)
}

#[tokio::test]
async fn insert_returns_stored_row() {
    let (_pool, gateway) = setup().await;

    let row = Mapper::teacher(Some(record(json!({ "id": "t1", "name": "Amal", "subjects": ["Math"] }))))
        .serialize()
        .unwrap();

    let stored = gateway
        .execute("teachers", Operation::Insert, &row)
        .await
        .unwrap()
        .expect("row returned");

    assert_eq!(stored, row);
    assert_eq!(stored["availability"], json!("{}"));
}

#[tokio::test]
async fn update_and_delete_by_key() {
    let (_pool, gateway) = setup().await;
    let row = record(json!({ "id": "c1", "name": "TA" }));
    gateway.execute("classes", Operation::Insert, &row).await.unwrap();

    let updated = gateway
        .execute("classes", Operation::Update, &record(json!({ "id": "c1", "name": "EM" })))
        .await
        .unwrap();
    assert_eq!(updated, Some(record(json!({ "id": "c1", "name": "EM" }))));

    let missing = gateway
        .execute("classes", Operation::Update, &record(json!({ "id": "nope", "name": "EM" })))
        .await
        .unwrap();
    assert_eq!(missing, None);

    let deleted = gateway
        .execute("classes", Operation::Delete, &record(json!({ "id": "c1" })))
        .await
        .unwrap();
    assert_eq!(deleted, Some(record(json!({ "id": "c1", "name": "EM" }))));

    let again = gateway
        .execute("classes", Operation::Delete, &record(json!({ "id": "c1" })))
        .await
        .unwrap();
    assert_eq!(again, None);
    assert!(gateway.fetch_all("classes").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_without_key_is_rejected() {
    let (_pool, gateway) = setup().await;

    let result = gateway
        .execute("classes", Operation::Update, &record(json!({ "name": "TA" })))
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn unknown_tables_and_columns_are_rejected() {
    let (_pool, gateway) = setup().await;

    let result = gateway.fetch_all("users").await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = gateway
        .execute("classes", Operation::Insert, &record(json!({ "id": "c1", "name; DROP TABLE classes": "x" })))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = gateway.fetch_where("classes", "subject", &json!("Math")).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn requirement_rows_get_generated_ids() {
    let (_pool, gateway) = setup().await;

    for (subject, hours) in [("Math", 4), ("Physics", 3)] {
        gateway
            .execute(
                "class_subject_requirements",
                Operation::Insert,
                &record(json!({ "class_id": "c1", "subject": subject, "hours_per_week": hours })),
            )
            .await
            .unwrap();
    }
    gateway
        .execute(
            "class_subject_requirements",
            Operation::Insert,
            &record(json!({ "class_id": "c2", "subject": "Math", "hours_per_week": 2 })),
        )
        .await
        .unwrap();

    let rows = gateway
        .fetch_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], json!(1));
    assert_eq!(rows[1]["subject"], json!("Physics"));
    assert_eq!(rows[1]["hours_per_week"], json!(3));

    let removed = gateway
        .delete_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(gateway.fetch_all("class_subject_requirements").await.unwrap().len(), 1);
}

#[tokio::test]
async fn schedule_rows_keep_integer_flag_and_null_week() {
    let (_pool, gateway) = setup().await;

    // the teacher does not exist; nothing checks that
    let row = Mapper::schedule(Some(record(json!({
        "id": "s1",
        "day": "monday",
        "startTime": "08:00",
        "endTime": "09:00",
        "teacherId": "ghost",
        "className": "TA",
        "subject": "Math",
        "isExam": true,
        "week": null
    }))))
    .serialize()
    .unwrap();

    let stored = gateway
        .execute("schedule", Operation::Insert, &row)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored["is_exam"], json!(1));
    assert_eq!(stored["week"], Value::Null);
    assert_eq!(stored["teacher_id"], json!("ghost"));
}

#[tokio::test]
async fn replace_all_swaps_table_contents() {
    let (_pool, gateway) = setup().await;
    gateway
        .execute("classes", Operation::Insert, &record(json!({ "id": "old", "name": "Old" })))
        .await
        .unwrap();

    let rows = vec![
        record(json!({ "id": "a", "name": "TA" })),
        record(json!({ "id": "b", "name": "EM" })),
    ];
    gateway.replace_all("classes", &rows).await.unwrap();

    assert_eq!(gateway.fetch_all("classes").await.unwrap(), rows);
}

#[tokio::test]
async fn failed_replace_keeps_previous_rows() {
    let (_pool, gateway) = setup().await;
    let old = record(json!({ "id": "old", "name": "Old" }));
    gateway.execute("classes", Operation::Insert, &old).await.unwrap();

    // duplicate primary key aborts the transaction
    let rows = vec![
        record(json!({ "id": "a", "name": "TA" })),
        record(json!({ "id": "a", "name": "EM" })),
    ];
    let result = gateway.replace_all("classes", &rows).await;

    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(gateway.fetch_all("classes").await.unwrap(), vec![old]);
}

async fn seed_requirements(gateway: &SqliteGateway) -> Vec<Record> {
    gateway
        .execute("classes", Operation::Insert, &record(json!({ "id": "c1", "name": "TA" })))
        .await
        .unwrap();
    for (subject, hours) in [("Math", 4), ("Physics", 2)] {
        gateway
            .execute(
                "class_subject_requirements",
                Operation::Insert,
                &record(json!({ "class_id": "c1", "subject": subject, "hours_per_week": hours })),
            )
            .await
            .unwrap();
    }
    gateway
        .fetch_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap()
}

#[tokio::test]
async fn write_all_applies_every_write() {
    let (_pool, gateway) = setup().await;
    seed_requirements(&gateway).await;

    let writes = [
        Write::Update {
            table: "classes",
            record: record(json!({ "id": "c1", "name": "EM" })),
        },
        Write::DeleteWhere {
            table: "class_subject_requirements",
            column: "class_id",
            value: json!("c1"),
        },
        Write::Insert {
            table: "class_subject_requirements",
            record: record(json!({ "class_id": "c1", "subject": "Chemistry", "hours_per_week": 3 })),
        },
    ];
    let affected = gateway.write_all(&writes).await.unwrap();
    assert_eq!(affected, vec![1, 2, 1]);

    let rows = gateway
        .fetch_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["subject"], json!("Chemistry"));
    assert_eq!(gateway.fetch_all("classes").await.unwrap()[0]["name"], json!("EM"));
}

#[tokio::test]
async fn failed_requirement_replace_keeps_previous_rows() {
    let (_pool, gateway) = setup().await;
    let before = seed_requirements(&gateway).await;

    // the last insert has no hours and violates NOT NULL
    let writes = [
        Write::Update {
            table: "classes",
            record: record(json!({ "id": "c1", "name": "EM" })),
        },
        Write::DeleteWhere {
            table: "class_subject_requirements",
            column: "class_id",
            value: json!("c1"),
        },
        Write::Insert {
            table: "class_subject_requirements",
            record: record(json!({ "class_id": "c1", "subject": "Chemistry", "hours_per_week": 3 })),
        },
        Write::Insert {
            table: "class_subject_requirements",
            record: record(json!({ "class_id": "c1", "subject": "Biology" })),
        },
    ];
    let result = gateway.write_all(&writes).await;
    assert!(matches!(result, Err(AppError::Database(_))));

    let after = gateway
        .fetch_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap();
    assert_eq!(after, before);
    assert_eq!(gateway.fetch_all("classes").await.unwrap()[0]["name"], json!("TA"));
}

#[tokio::test]
async fn write_all_checks_every_write_before_running() {
    let (_pool, gateway) = setup().await;
    let before = seed_requirements(&gateway).await;

    let writes = [
        Write::DeleteWhere {
            table: "class_subject_requirements",
            column: "class_id",
            value: json!("c1"),
        },
        Write::Insert {
            table: "class_subject_requirements",
            record: record(json!({ "class_id": "c1", "teacher": "t1" })),
        },
    ];
    let result = gateway.write_all(&writes).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let after = gateway
        .fetch_where("class_subject_requirements", "class_id", &json!("c1"))
        .await
        .unwrap();
    assert_eq!(after, before);
}
