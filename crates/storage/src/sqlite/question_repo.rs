use std::collections::HashMap;

use practice_core::model::{CategoryId, Difficulty, Question, QuestionFilter, QuestionId};
use sqlx::Row;

use super::mapping::{
    category_id_from_i64, category_id_to_i64, question_id_from_i64, question_id_to_i64, ser,
};
use super::SqliteRepository;
use crate::repository::{QuestionRepository, StorageError};

fn map_question_row(
    row: &sqlx::sqlite::SqliteRow,
    categories: Vec<CategoryId>,
) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let difficulty =
        Difficulty::parse(row.try_get::<String, _>("difficulty").map_err(ser)?.as_str())
            .map_err(ser)?;
    let active: i64 = row.try_get("active").map_err(ser)?;

    let times_used_i64: i64 = row.try_get("times_used").map_err(ser)?;
    let times_used = u64::try_from(times_used_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid times_used: {times_used_i64}"))
    })?;

    Question::new(
        id,
        row.try_get::<String, _>("content").map_err(ser)?,
        difficulty,
        categories,
        active != 0,
        times_used,
    )
    .map_err(ser)
}

impl SqliteRepository {
    async fn categories_for(
        &self,
        question_ids: &[QuestionId],
    ) -> Result<HashMap<u64, Vec<CategoryId>>, StorageError> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sql = String::from(
            "SELECT question_id, category_id FROM question_categories WHERE question_id IN (",
        );
        for i in 0..question_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut q = sqlx::query(&sql);
        for id in question_ids {
            q = q.bind(question_id_to_i64(*id)?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_question: HashMap<u64, Vec<CategoryId>> = HashMap::new();
        for row in rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            let question_id = u64::try_from(question_id)
                .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))?;
            let category = category_id_from_i64(row.try_get::<i64, _>("category_id").map_err(ser)?)?;
            by_question.entry(question_id).or_default().push(category);
        }
        Ok(by_question)
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, content, difficulty, active, times_used
            FROM questions
            WHERE id = ?1
            ",
        )
        .bind(question_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let categories = self
            .categories_for(&[id])
            .await?
            .remove(&id.value())
            .unwrap_or_default();
        map_question_row(&row, categories).map(Some)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_question(*id).await? {
                Some(question) => out.push(question),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, content, difficulty, active, times_used
            FROM questions
            WHERE active = 1
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?);
        }
        let mut categories = self.categories_for(&ids).await?;

        // Category/difficulty matching reuses the domain filter so the SQL
        // stays a simple active scan.
        let mut questions = Vec::new();
        for (row, id) in rows.iter().zip(ids) {
            let question =
                map_question_row(row, categories.remove(&id.value()).unwrap_or_default())?;
            if filter.matches(&question) {
                questions.push(question);
            }
        }
        Ok(questions)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO questions (id, content, difficulty, active, times_used)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                difficulty = excluded.difficulty,
                active = excluded.active,
                times_used = excluded.times_used
            ",
        )
        .bind(question_id_to_i64(question.id())?)
        .bind(question.content())
        .bind(question.difficulty().as_str())
        .bind(i64::from(question.is_active()))
        .bind(
            i64::try_from(question.times_used())
                .map_err(|_| StorageError::Serialization("times_used overflow".into()))?,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM question_categories WHERE question_id = ?1")
            .bind(question_id_to_i64(question.id())?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for category in question.category_ids() {
            sqlx::query(
                r"
                INSERT INTO question_categories (question_id, category_id)
                VALUES (?1, ?2)
                ON CONFLICT(question_id, category_id) DO NOTHING
                ",
            )
            .bind(question_id_to_i64(question.id())?)
            .bind(category_id_to_i64(*category)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
