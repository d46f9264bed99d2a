use chrono::{DateTime, Utc};
use practice_core::model::{AccountId, UsageAction, UsageEvent};
use sqlx::Row;

use super::mapping::{account_id_to_i64, ser};
use super::SqliteRepository;
use crate::repository::{StorageError, UsageRepository};

#[async_trait::async_trait]
impl UsageRepository for SqliteRepository {
    async fn append_event(&self, event: &UsageEvent) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO usage_events (account_id, action, occurred_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(account_id_to_i64(event.account_id)?)
        .bind(event.action.as_str())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn count_events(
        &self,
        account_id: AccountId,
        action: UsageAction,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n
            FROM usage_events
            WHERE account_id = ?1 AND action = ?2 AND occurred_at >= ?3
            ",
        )
        .bind(account_id_to_i64(account_id)?)
        .bind(action.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u32::try_from(n).map_err(|_| StorageError::Serialization(format!("event count overflow: {n}")))
    }
}
