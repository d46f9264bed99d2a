use practice_core::model::{Account, AccountId, SubscriptionTier};
use sqlx::Row;

use super::mapping::{account_id_from_i64, account_id_to_i64, ser};
use super::SqliteRepository;
use crate::repository::{AccountRepository, StorageError};

#[async_trait::async_trait]
impl AccountRepository for SqliteRepository {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query("SELECT id, tier FROM accounts WHERE id = ?1")
            .bind(account_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id = account_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
        let tier = SubscriptionTier::parse(row.try_get::<String, _>("tier").map_err(ser)?.as_str())
            .map_err(ser)?;
        Ok(Some(Account::new(id, tier)))
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO accounts (id, tier)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET tier = excluded.tier
            ",
        )
        .bind(account_id_to_i64(account.id())?)
        .bind(account.tier().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
