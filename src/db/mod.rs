pub mod gateway;
pub mod repository;
pub mod schema;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use gateway::{Operation, SqliteGateway, StorageGateway, Write};

/// Opens a pool on `database_url`. Foreign keys stay off: slots may point at
/// teachers that no longer exist.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(false);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Creates the four timetable tables if they are missing.
pub async fn migrate(db: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(db).await
}
