use practice_core::model::{
    Answer, AnswerId, QuestionId, Session, SessionId, SessionStatus, UsageEvent,
};

use super::mapping::{
    account_id_to_i64, feedback_to_json, map_answer_row, question_id_to_i64, ser,
};
use super::SqliteRepository;
use crate::repository::{NewAnswerSlot, SessionRepository, StorageError};

const SELECT_ANSWER_COLUMNS: &str = r"
    SELECT id, session_id, question_id, ordinal, answer_text, answered_at, score, feedback
    FROM answers
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        session: &Session,
        slots: &[NewAnswerSlot],
    ) -> Result<Vec<Answer>, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let inserted = sqlx::query(
            r"
            INSERT INTO sessions (
                id, account_id, kind, status, question_count,
                started_at, completed_at, overall_score
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(session.id().to_string())
        .bind(account_id_to_i64(session.account_id())?)
        .bind(session.kind().as_str())
        .bind(session.status().as_str())
        .bind(i64::from(session.question_count()))
        .bind(session.started_at())
        .bind(session.completed_at())
        .bind(session.overall_score())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let mut answers = Vec::with_capacity(slots.len());
        for slot in slots {
            let result = sqlx::query(
                r"
                INSERT INTO answers (session_id, question_id, ordinal)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(session.id().to_string())
            .bind(question_id_to_i64(slot.question_id)?)
            .bind(i64::from(slot.ordinal))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            let id = u64::try_from(result.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("answer rowid overflow".into()))?;
            let answer = Answer::new(
                AnswerId::new(id),
                session.id(),
                slot.question_id,
                slot.ordinal,
            )
            .map_err(ser)?;
            answers.push(answer);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        answers.sort_by_key(Answer::ordinal);
        Ok(answers)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, account_id, kind, status, question_count,
                   started_at, completed_at, overall_score
            FROM sessions
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| super::mapping::map_session_row(&row)).transpose()
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError> {
        let sql = format!("{SELECT_ANSWER_COLUMNS} WHERE session_id = ?1 ORDER BY ordinal ASC");
        let rows = sqlx::query(&sql)
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(map_answer_row(&row)?);
        }
        Ok(answers)
    }

    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError> {
        let sql = format!("{SELECT_ANSWER_COLUMNS} WHERE session_id = ?1 AND question_id = ?2");
        let row = sqlx::query(&sql)
            .bind(session_id.to_string())
            .bind(question_id_to_i64(question_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| map_answer_row(&row)).transpose()
    }

    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE answers
            SET answer_text = ?1,
                answered_at = ?2,
                score = ?3,
                feedback = ?4
            WHERE id = ?5
            ",
        )
        .bind(answer.answer_text())
        .bind(answer.answered_at())
        .bind(answer.score().map(i64::from))
        .bind(feedback_to_json(answer.feedback())?)
        .bind(
            i64::try_from(answer.id().value())
                .map_err(|_| StorageError::Serialization("answer_id overflow".into()))?,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn complete_session(
        &self,
        session: &Session,
        question_ids: &[QuestionId],
        event: &UsageEvent,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The in-progress guard makes a double completion a no-op here and a
        // Conflict for the caller, so the ledger is never charged twice.
        let updated = sqlx::query(
            r"
            UPDATE sessions
            SET status = ?1,
                completed_at = ?2,
                overall_score = ?3
            WHERE id = ?4 AND status = ?5
            ",
        )
        .bind(session.status().as_str())
        .bind(session.completed_at())
        .bind(session.overall_score())
        .bind(session.id().to_string())
        .bind(SessionStatus::InProgress.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM sessions WHERE id = ?1")
                .bind(session.id().to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        for question_id in question_ids {
            let bumped = sqlx::query(
                r"
                UPDATE questions
                SET times_used = times_used + 1
                WHERE id = ?1
                ",
            )
            .bind(question_id_to_i64(*question_id)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
            if bumped.rows_affected() == 0 {
                return Err(StorageError::NotFound);
            }
        }

        sqlx::query(
            r"
            INSERT INTO usage_events (account_id, action, occurred_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(account_id_to_i64(event.account_id)?)
        .bind(event.action.as_str())
        .bind(event.occurred_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
