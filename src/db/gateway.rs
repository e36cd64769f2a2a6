use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use crate::db::schema::TableDef;
use crate::error::AppError;
use crate::mapper::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// Executes persistence operations addressed by table name. Rows go in and
/// come out in storage shape; the gateway knows nothing about mappers.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Insert returns the stored row. Update and delete return the affected
    /// row, or `None` when no row has the record's key.
    async fn execute(
        &self,
        table: &str,
        operation: Operation,
        record: &Record,
    ) -> Result<Option<Record>, AppError>;

    async fn fetch_all(&self, table: &str) -> Result<Vec<Record>, AppError>;

    async fn fetch_where(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError>;

    async fn delete_where(&self, table: &str, column: &str, value: &Value)
    -> Result<u64, AppError>;

    /// Clears the table and inserts `records` in one transaction.
    async fn replace_all(&self, table: &str, records: &[Record]) -> Result<(), AppError>;

    /// Runs `writes` in order inside one transaction and returns the rows
    /// affected by each. On any failure nothing is kept.
    async fn write_all(&self, writes: &[Write]) -> Result<Vec<u64>, AppError>;
}

/// One statement of a [`StorageGateway::write_all`] batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert {
        table: &'static str,
        record: Record,
    },
    /// Keyed by the table's primary key, which `record` must carry.
    Update {
        table: &'static str,
        record: Record,
    },
    DeleteWhere {
        table: &'static str,
        column: &'static str,
        value: Value,
    },
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

#[derive(Clone)]
pub struct SqliteGateway {
    db: SqlitePool,
}

impl SqliteGateway {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StorageGateway for SqliteGateway {
    async fn execute(
        &self,
        table: &str,
        operation: Operation,
        record: &Record,
    ) -> Result<Option<Record>, AppError> {
        let def = table_def(table)?;
        check_columns(def, record)?;

        let (sql, values) = match operation {
            Operation::Insert => {
                let (sql, values) = insert_sql(def, record)?;
                (format!("{} RETURNING *", sql), values)
            }
            Operation::Update => match update_sql(def, record)? {
                Some((sql, values)) => (format!("{} RETURNING *", sql), values),
                None => (
                    format!("SELECT * FROM {} WHERE {} = ?", def.name, def.key),
                    vec![key_value(def, record)?],
                ),
            },
            Operation::Delete => {
                let key = key_value(def, record)?;
                (
                    format!("DELETE FROM {} WHERE {} = ? RETURNING *", def.name, def.key),
                    vec![key],
                )
            }
        };

        debug!("{:?} on {}: {}", operation, def.name, sql);

        let row = bind_all(sqlx::query(&sql), &values)
            .fetch_optional(&self.db)
            .await?;

        match (operation, row) {
            (_, Some(row)) => Ok(Some(row_to_record(&row)?)),
            (Operation::Insert, None) => Err(AppError::InternalServerError),
            (_, None) => Ok(None),
        }
    }

    async fn fetch_all(&self, table: &str) -> Result<Vec<Record>, AppError> {
        let def = table_def(table)?;
        let sql = format!("SELECT * FROM {} ORDER BY {}", def.name, def.key);

        let rows = sqlx::query(&sql).fetch_all(&self.db).await?;
        rows.iter()
            .map(|row| row_to_record(row).map_err(AppError::from))
            .collect()
    }

    async fn fetch_where(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError> {
        let def = table_def(table)?;
        check_column(def, column)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {}",
            def.name, column, def.key
        );

        let rows = bind_value(sqlx::query(&sql), value)
            .fetch_all(&self.db)
            .await?;
        rows.iter()
            .map(|row| row_to_record(row).map_err(AppError::from))
            .collect()
    }

    async fn delete_where(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<u64, AppError> {
        let def = table_def(table)?;
        check_column(def, column)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?", def.name, column);

        let affected = bind_value(sqlx::query(&sql), value)
            .execute(&self.db)
            .await?
            .rows_affected();

        debug!("deleted {} rows from {}", affected, def.name);
        Ok(affected)
    }

    async fn replace_all(&self, table: &str, records: &[Record]) -> Result<(), AppError> {
        let def = table_def(table)?;
        for record in records {
            check_columns(def, record)?;
        }

        let mut tx = self.db.begin().await?;

        let clear = format!("DELETE FROM {}", def.name);
        sqlx::query(&clear).execute(&mut *tx).await?;

        for record in records {
            let (sql, values) = insert_sql(def, record)?;
            bind_all(sqlx::query(&sql), &values)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("replaced {} with {} rows", def.name, records.len());
        Ok(())
    }

    async fn write_all(&self, writes: &[Write]) -> Result<Vec<u64>, AppError> {
        let statements = writes
            .iter()
            .map(write_sql)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.db.begin().await?;
        let mut affected = Vec::with_capacity(statements.len());

        for statement in statements {
            let rows = match statement {
                Some((sql, values)) => {
                    debug!("batch: {}", sql);
                    bind_all(sqlx::query(&sql), &values)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected()
                }
                None => 0,
            };
            affected.push(rows);
        }

        tx.commit().await?;
        debug!("committed batch of {} writes", writes.len());
        Ok(affected)
    }
}

fn table_def(name: &str) -> Result<&'static TableDef, AppError> {
    TableDef::lookup(name).ok_or_else(|| AppError::BadRequest(format!("Unknown table `{}`", name)))
}

fn check_column(def: &TableDef, column: &str) -> Result<(), AppError> {
    if def.has_column(column) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Unknown column `{}` for table `{}`",
            column, def.name
        )))
    }
}

fn check_columns(def: &TableDef, record: &Record) -> Result<(), AppError> {
    record.keys().try_for_each(|column| check_column(def, column))
}

fn key_value<'r>(def: &TableDef, record: &'r Record) -> Result<&'r Value, AppError> {
    record
        .get(def.key)
        .ok_or_else(|| AppError::BadRequest(format!("Record has no `{}`", def.key)))
}

fn insert_sql<'r>(
    def: &TableDef,
    record: &'r Record,
) -> Result<(String, Vec<&'r Value>), AppError> {
    if record.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Nothing to insert into `{}`",
            def.name
        )));
    }

    let columns = record.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; record.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        def.name, columns, placeholders
    );

    Ok((sql, record.values().collect()))
}

/// `UPDATE .. SET .. WHERE key = ?`, or `None` when only the key is present.
fn update_sql<'r>(
    def: &TableDef,
    record: &'r Record,
) -> Result<Option<(String, Vec<&'r Value>)>, AppError> {
    let key = key_value(def, record)?;
    let assignments: Vec<(&String, &Value)> =
        record.iter().filter(|(c, _)| c.as_str() != def.key).collect();

    if assignments.is_empty() {
        return Ok(None);
    }

    let set = assignments
        .iter()
        .map(|(c, _)| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut values: Vec<&Value> = assignments.iter().map(|(_, v)| *v).collect();
    values.push(key);

    Ok(Some((
        format!("UPDATE {} SET {} WHERE {} = ?", def.name, set, def.key),
        values,
    )))
}

fn write_sql(write: &Write) -> Result<Option<(String, Vec<&Value>)>, AppError> {
    match write {
        Write::Insert { table, record } => {
            let def = table_def(table)?;
            check_columns(def, record)?;
            insert_sql(def, record).map(Some)
        }
        Write::Update { table, record } => {
            let def = table_def(table)?;
            check_columns(def, record)?;
            update_sql(def, record)
        }
        Write::DeleteWhere {
            table,
            column,
            value,
        } => {
            let def = table_def(table)?;
            check_column(def, column)?;
            Ok(Some((
                format!("DELETE FROM {} WHERE {} = ?", def.name, column),
                vec![value],
            )))
        }
    }
}

fn bind_all<'q>(query: SqliteQuery<'q>, values: &[&Value]) -> SqliteQuery<'q> {
    values.iter().fold(query, |query, value| bind_value(query, value))
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        // composites should have been encoded by a mapper already
        composite => query.bind(composite.to_string()),
    }
}

fn row_to_record(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => Value::from(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };

        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}
