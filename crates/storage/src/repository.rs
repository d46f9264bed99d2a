use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use practice_core::model::{
    Account, AccountId, Answer, AnswerId, Question, QuestionFilter, QuestionId, Session, SessionId,
    SessionStatus, UsageAction, UsageEvent,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Request to pre-allocate one answer slot at session creation.
///
/// Storage assigns the `AnswerId`; the caller supplies the question binding
/// and the 1-based ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAnswerSlot {
    pub question_id: QuestionId,
    pub ordinal: u32,
}

/// Repository contract for sessions and their answer slots.
///
/// Sessions and answers are persisted by id; there is no navigation graph.
/// Callers that need question content alongside answers hydrate explicitly
/// through `QuestionRepository::get_questions`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session together with all of its answer slots atomically.
    ///
    /// Returns the created answers with storage-assigned ids, ordered by
    /// ordinal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session id already exists,
    /// or other storage errors.
    async fn insert_session(
        &self,
        session: &Session,
        slots: &[NewAnswerSlot],
    ) -> Result<Vec<Answer>, StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when absent.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// All answer slots of a session, ordered by ordinal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError>;

    /// Locate the answer slot binding `question_id` within a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when the
    /// question is not part of the session.
    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError>;

    /// Persist the mutable fields of an answer slot (text, timestamps,
    /// score, feedback).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the slot does not exist.
    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError>;

    /// Persist a session completion in one transaction: the terminal session
    /// fields, a `times_used` bump for every referenced question, and the
    /// usage-ledger entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored session is not
    /// `InProgress` anymore, `StorageError::NotFound` if it is absent.
    async fn complete_session(
        &self,
        session: &Session,
        question_ids: &[QuestionId],
        event: &UsageEvent,
    ) -> Result<(), StorageError>;
}

/// Read access to the question catalog, plus the usage-counter write.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Fetch one question snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when absent.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Fetch a batch of question snapshots for hydration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// Active questions matching the filter, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError>;

    /// Persist or update a question snapshot (catalog seeding and tests).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Append-only quota ledger.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Append one usage event; returns its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn append_event(&self, event: &UsageEvent) -> Result<i64, StorageError>;

    /// Count events for one account and one exact action since `since`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_events(
        &self,
        account_id: AccountId,
        action: UsageAction,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError>;
}

/// Caller accounts with their subscription tier.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when absent.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Persist or update an account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the account cannot be stored.
    async fn upsert_account(&self, account: &Account) -> Result<(), StorageError>;
}

/// Named configuration values.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch a configuration value by key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when unset.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Persist a configuration value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_value(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// State is held in arena-style maps keyed by id.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    sessions: HashMap<SessionId, Session>,
    answers: HashMap<SessionId, Vec<Answer>>,
    questions: HashMap<QuestionId, Question>,
    accounts: HashMap<AccountId, Account>,
    usage_events: Vec<UsageEvent>,
    settings: HashMap<String, String>,
    next_answer_id: u64,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        session: &Session,
        slots: &[NewAnswerSlot],
    ) -> Result<Vec<Answer>, StorageError> {
        let mut state = self.lock()?;
        if state.sessions.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }

        let mut answers = Vec::with_capacity(slots.len());
        for slot in slots {
            state.next_answer_id += 1;
            let answer = Answer::new(
                AnswerId::new(state.next_answer_id),
                session.id(),
                slot.question_id,
                slot.ordinal,
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
            answers.push(answer);
        }
        answers.sort_by_key(Answer::ordinal);

        state.sessions.insert(session.id(), session.clone());
        state.answers.insert(session.id(), answers.clone());
        Ok(answers)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError> {
        Ok(self
            .lock()?
            .answers
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError> {
        Ok(self.lock()?.answers.get(&session_id).and_then(|answers| {
            answers
                .iter()
                .find(|a| a.question_id() == question_id)
                .cloned()
        }))
    }

    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let answers = state
            .answers
            .get_mut(&answer.session_id())
            .ok_or(StorageError::NotFound)?;
        let slot = answers
            .iter_mut()
            .find(|a| a.id() == answer.id())
            .ok_or(StorageError::NotFound)?;
        *slot = answer.clone();
        Ok(())
    }

    async fn complete_session(
        &self,
        session: &Session,
        question_ids: &[QuestionId],
        event: &UsageEvent,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let stored = state
            .sessions
            .get(&session.id())
            .ok_or(StorageError::NotFound)?;
        if stored.status() != SessionStatus::InProgress {
            return Err(StorageError::Conflict);
        }

        for question_id in question_ids {
            let question = state
                .questions
                .get(question_id)
                .ok_or(StorageError::NotFound)?;
            let bumped = Question::new(
                question.id(),
                question.content(),
                question.difficulty(),
                question.category_ids().to_vec(),
                question.is_active(),
                question.times_used() + 1,
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
            state.questions.insert(*question_id, bumped);
        }

        state.sessions.insert(session.id(), session.clone());
        state.usage_events.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match state.questions.get(id) {
                Some(question) => out.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        let mut matching: Vec<Question> = state
            .questions
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        matching.sort_by_key(Question::id);
        Ok(matching)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        self.lock()?
            .questions
            .insert(question.id(), question.clone());
        Ok(())
    }
}

#[async_trait]
impl UsageRepository for InMemoryRepository {
    async fn append_event(&self, event: &UsageEvent) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        state.usage_events.push(event.clone());
        Ok(i64::try_from(state.usage_events.len()).unwrap_or(i64::MAX))
    }

    async fn count_events(
        &self,
        account_id: AccountId,
        action: UsageAction,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let count = self
            .lock()?
            .usage_events
            .iter()
            .filter(|e| e.account_id == account_id && e.action == action && e.occurred_at >= since)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        Ok(self.lock()?.accounts.get(&id).copied())
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StorageError> {
        self.lock()?.accounts.insert(account.id(), *account);
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.settings.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub usage: Arc<dyn UsageRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            sessions: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            usage: Arc::new(repo.clone()),
            accounts: Arc::new(repo.clone()),
            settings: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{Difficulty, SessionKind, SubscriptionTier};
    use practice_core::time::fixed_now;

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}?"),
            Difficulty::Medium,
            Vec::new(),
            true,
            0,
        )
        .unwrap()
    }

    fn build_session(account: u64, count: u32) -> Session {
        Session::new(
            SessionId::generate(),
            AccountId::new(account),
            SessionKind::MockInterview,
            count,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_session_assigns_contiguous_answer_ids() {
        let repo = InMemoryRepository::new();
        let session = build_session(1, 2);
        let slots = [
            NewAnswerSlot {
                question_id: QuestionId::new(10),
                ordinal: 1,
            },
            NewAnswerSlot {
                question_id: QuestionId::new(11),
                ordinal: 2,
            },
        ];

        let answers = repo.insert_session(&session, &slots).await.unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].ordinal(), 1);
        assert_eq!(answers[1].ordinal(), 2);
        assert_ne!(answers[0].id(), answers[1].id());

        let err = repo.insert_session(&session, &slots).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn complete_session_bumps_usage_and_ledger() {
        let repo = InMemoryRepository::new();
        let question = build_question(10);
        repo.upsert_question(&question).await.unwrap();

        let mut session = build_session(1, 1);
        repo.insert_session(
            &session,
            &[NewAnswerSlot {
                question_id: question.id(),
                ordinal: 1,
            }],
        )
        .await
        .unwrap();

        session.complete(fixed_now(), Some(80.0)).unwrap();
        let event = UsageEvent::new(
            AccountId::new(1),
            UsageAction::CompleteFullMockInterview,
            fixed_now(),
        );
        repo.complete_session(&session, &[question.id()], &event)
            .await
            .unwrap();

        let stored = repo.get_question(question.id()).await.unwrap().unwrap();
        assert_eq!(stored.times_used(), 1);
        let count = repo
            .count_events(
                AccountId::new(1),
                UsageAction::CompleteFullMockInterview,
                fixed_now() - chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(count, 1);

        // second completion must be refused at the storage layer too
        let err = repo
            .complete_session(&session, &[question.id()], &event)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn count_events_is_scoped_to_account_action_and_window() {
        let repo = InMemoryRepository::new();
        let account = AccountId::new(7);
        let early = fixed_now() - chrono::Duration::days(1);

        repo.append_event(&UsageEvent::new(
            account,
            UsageAction::CompleteSingleQuestion,
            early,
        ))
        .await
        .unwrap();
        repo.append_event(&UsageEvent::new(
            account,
            UsageAction::CompleteSingleQuestion,
            fixed_now(),
        ))
        .await
        .unwrap();
        repo.append_event(&UsageEvent::new(
            account,
            UsageAction::CompleteFullMockInterview,
            fixed_now(),
        ))
        .await
        .unwrap();
        repo.append_event(&UsageEvent::new(
            AccountId::new(8),
            UsageAction::CompleteSingleQuestion,
            fixed_now(),
        ))
        .await
        .unwrap();

        let count = repo
            .count_events(
                account,
                UsageAction::CompleteSingleQuestion,
                fixed_now() - chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn accounts_and_settings_round_trip() {
        let repo = InMemoryRepository::new();
        let account = Account::new(AccountId::new(3), SubscriptionTier::Pro);
        repo.upsert_account(&account).await.unwrap();
        assert_eq!(
            repo.get_account(account.id()).await.unwrap(),
            Some(account)
        );
        assert_eq!(repo.get_account(AccountId::new(4)).await.unwrap(), None);

        assert_eq!(repo.get_value("missing").await.unwrap(), None);
        repo.set_value("FREE_USER_QUESTION_DAILY_LIMIT", "7")
            .await
            .unwrap();
        assert_eq!(
            repo.get_value("FREE_USER_QUESTION_DAILY_LIMIT")
                .await
                .unwrap(),
            Some("7".to_string())
        );
    }
}
