use sqlx::Row;
use uuid::Uuid;

use practice_core::model::{
    AccountId, Answer, AnswerId, CategoryId, Feedback, QuestionId, Session, SessionId, SessionKind,
    SessionStatus,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn account_id_from_i64(v: i64) -> Result<AccountId, StorageError> {
    Ok(AccountId::new(i64_to_u64("account_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u64("category_id", v)?))
}

pub(crate) fn account_id_to_i64(id: AccountId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("account_id overflow".into()))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn category_id_to_i64(id: CategoryId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("category_id overflow".into()))
}

pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    Uuid::parse_str(s)
        .map(SessionId::from_uuid)
        .map_err(|_| StorageError::Serialization(format!("invalid session id: {s}")))
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StorageError> {
    let id = session_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let account_id = account_id_from_i64(row.try_get::<i64, _>("account_id").map_err(ser)?)?;
    let kind =
        SessionKind::parse(row.try_get::<String, _>("kind").map_err(ser)?.as_str()).map_err(ser)?;
    let status = SessionStatus::parse(row.try_get::<String, _>("status").map_err(ser)?.as_str())
        .map_err(ser)?;

    let question_count_i64: i64 = row.try_get("question_count").map_err(ser)?;
    let question_count = u32::try_from(question_count_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid question_count: {question_count_i64}"))
    })?;

    Session::from_persisted(
        id,
        account_id,
        kind,
        status,
        question_count,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("overall_score").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer, StorageError> {
    let id = AnswerId::new(i64_to_u64(
        "answer_id",
        row.try_get::<i64, _>("id").map_err(ser)?,
    )?);
    let session_id =
        session_id_from_str(row.try_get::<String, _>("session_id").map_err(ser)?.as_str())?;
    let question_id = question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?;

    let ordinal_i64: i64 = row.try_get("ordinal").map_err(ser)?;
    let ordinal = u32::try_from(ordinal_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid ordinal: {ordinal_i64}")))?;

    let score: Option<i64> = row.try_get("score").map_err(ser)?;
    let score = score
        .map(|s| {
            u16::try_from(s)
                .map_err(|_| StorageError::Serialization(format!("invalid score: {s}")))
        })
        .transpose()?;

    let feedback: Option<String> = row.try_get("feedback").map_err(ser)?;
    let feedback: Option<Feedback> = feedback
        .map(|json| serde_json::from_str(&json).map_err(ser))
        .transpose()?;

    Answer::from_persisted(
        id,
        session_id,
        question_id,
        ordinal,
        row.try_get("answer_text").map_err(ser)?,
        row.try_get("answered_at").map_err(ser)?,
        score,
        feedback,
    )
    .map_err(ser)
}

pub(crate) fn feedback_to_json(feedback: Option<&Feedback>) -> Result<Option<String>, StorageError> {
    feedback
        .map(|fb| serde_json::to_string(fb).map_err(ser))
        .transpose()
}
