use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::{SqliteGateway, StorageGateway};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub storage: Arc<dyn StorageGateway>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        let storage = Arc::new(SqliteGateway::new(db.clone()));
        Self { db, storage }
    }
}
