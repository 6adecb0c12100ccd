//! Persistence of the three state records across restarts, keyed by thermostat id.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::state::{AdjustmentState, ErrorState, NotificationState};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("state encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub adjustment: AdjustmentState,
    pub notification: NotificationState,
    pub errors: ErrorState,
}

#[async_trait::async_trait]
pub trait StateRepository: Send + Sync {
    async fn load(&self, thermostat_id: &str) -> Result<Option<PersistedState>, StoreError>;

    async fn save(&self, thermostat_id: &str, state: &PersistedState) -> Result<(), StoreError>;
}

/// Postgres-backed store over the `thermostat_state` table.
#[derive(Debug, Clone)]
pub struct StateStore {
    pool: PgPool,
}

impl StateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StateRepository for StateStore {
    async fn load(&self, thermostat_id: &str) -> Result<Option<PersistedState>, StoreError> {
        let row: Option<(Json<AdjustmentState>, Json<NotificationState>, Json<ErrorState>)> =
            sqlx::query_as(
                "SELECT adjustment, notification, errors FROM thermostat_state WHERE thermostat_id = $1",
            )
            .bind(thermostat_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(Json(adjustment), Json(notification), Json(errors))| PersistedState {
            adjustment,
            notification,
            errors,
        }))
    }

    async fn save(&self, thermostat_id: &str, state: &PersistedState) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO thermostat_state (thermostat_id, adjustment, notification, errors, updated_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (thermostat_id) DO UPDATE SET \
             adjustment = EXCLUDED.adjustment, notification = EXCLUDED.notification, \
             errors = EXCLUDED.errors, updated_at = now()",
        )
        .bind(thermostat_id)
        .bind(Json(&state.adjustment))
        .bind(Json(&state.notification))
        .bind(Json(&state.errors))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-process store. Records are kept as JSON so they go through the same
/// encoding as the database path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateRepository for MemoryStore {
    async fn load(&self, thermostat_id: &str) -> Result<Option<PersistedState>, StoreError> {
        let row = self
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thermostat_id)
            .cloned();
        row.map(serde_json::from_value).transpose().map_err(StoreError::from)
    }

    async fn save(&self, thermostat_id: &str, state: &PersistedState) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)?;
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(thermostat_id.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn memory_store_saves_per_thermostat() {
        let store = MemoryStore::new();
        assert!(store.load("t1").await.unwrap().is_none());

        let now = Utc::now();
        let state = PersistedState {
            adjustment: AdjustmentState::default().record_adjustment(72.0, 70.0, now),
            notification: NotificationState::default().record_suppressed(),
            errors: ErrorState::default().record_error("boom", now),
        };
        store.save("t1", &state).await.unwrap();

        assert_eq!(store.load("t1").await.unwrap(), Some(state));
        assert!(store.load("t2").await.unwrap().is_none());
    }
}
