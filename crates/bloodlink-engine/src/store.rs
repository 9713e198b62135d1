use std::sync::Arc;

use bloodlink_db::Database;

use crate::error::EngineError;

/// Async handle on the registry. SQLite calls block, so each one runs on the
/// blocking pool.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub async fn call<F, T>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| EngineError::PersistenceFailure(anyhow::anyhow!("store task failed: {}", e)))?
            .map_err(EngineError::PersistenceFailure)
    }
}
