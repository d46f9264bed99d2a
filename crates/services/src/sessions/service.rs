use std::sync::Arc;

use practice_core::Clock;
use practice_core::model::{
    Account, AccountId, QuestionFilter, QuestionId, Session, SessionId, SessionKind, UsageAction,
    UsageEvent,
};
use storage::repository::{
    AccountRepository, NewAnswerSlot, QuestionRepository, SessionRepository,
};

use crate::error::ServiceError;
use crate::quota::QuotaGate;
use crate::selector::QuestionSelector;
use crate::sessions::view::SessionView;

/// Starts, reads, and completes practice sessions.
#[derive(Clone)]
pub struct PracticeSessionService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    accounts: Arc<dyn AccountRepository>,
    quota: QuotaGate,
    selector: QuestionSelector,
}

impl PracticeSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        questions: Arc<dyn QuestionRepository>,
        accounts: Arc<dyn AccountRepository>,
        quota: QuotaGate,
        selector: QuestionSelector,
    ) -> Self {
        Self {
            clock,
            sessions,
            questions,
            accounts,
            quota,
            selector,
        }
    }

    async fn resolve_account(&self, account_id: AccountId) -> Result<Account, ServiceError> {
        self.accounts
            .get_account(account_id)
            .await?
            .ok_or(ServiceError::Unauthorized)
    }

    /// Load a session owned by `account_id`.
    ///
    /// A session owned by someone else reads as absent.
    async fn owned_session(
        &self,
        session_id: SessionId,
        account_id: AccountId,
    ) -> Result<Session, ServiceError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(ServiceError::NotFound("session"))?;
        if session.account_id() != account_id {
            return Err(ServiceError::NotFound("session"));
        }
        Ok(session)
    }

    /// Start a single-question session on one chosen question.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for an unknown account, `QuotaExceeded` when
    /// the free-tier daily cap is reached, `NotFound` when the question is
    /// missing or inactive, or a storage error.
    pub async fn start_single_question(
        &self,
        account_id: AccountId,
        question_id: QuestionId,
    ) -> Result<SessionView, ServiceError> {
        let account = self.resolve_account(account_id).await?;
        self.quota
            .check(&account, UsageAction::CompleteSingleQuestion)
            .await?;

        let question = self
            .questions
            .get_question(question_id)
            .await?
            .filter(|q| q.is_active())
            .ok_or(ServiceError::NotFound("question"))?;

        let session = Session::new(
            SessionId::generate(),
            account_id,
            SessionKind::SingleQuestion,
            1,
            self.clock.now(),
        )?;
        let answers = self
            .sessions
            .insert_session(
                &session,
                &[NewAnswerSlot {
                    question_id: question.id(),
                    ordinal: 1,
                }],
            )
            .await?;

        Ok(SessionView::hydrate(
            &session,
            &answers,
            std::slice::from_ref(&question),
        ))
    }

    /// Start a mock interview with `count` questions drawn from the pool.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for an unknown account, `QuotaExceeded` when
    /// the free-tier daily cap is reached, `InsufficientPool` when too few
    /// questions match the filter, or a storage error.
    pub async fn start_mock_interview(
        &self,
        account_id: AccountId,
        filter: &QuestionFilter,
        count: u32,
    ) -> Result<SessionView, ServiceError> {
        let account = self.resolve_account(account_id).await?;
        self.quota
            .check(&account, UsageAction::CompleteFullMockInterview)
            .await?;

        let picked = self.selector.select(filter, count).await?;

        let session = Session::new(
            SessionId::generate(),
            account_id,
            SessionKind::MockInterview,
            count,
            self.clock.now(),
        )?;
        let slots: Vec<NewAnswerSlot> = picked
            .iter()
            .enumerate()
            .map(|(i, question)| NewAnswerSlot {
                question_id: question.id(),
                ordinal: u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1),
            })
            .collect();
        let answers = self.sessions.insert_session(&session, &slots).await?;

        Ok(SessionView::hydrate(&session, &answers, &picked))
    }

    /// Complete a mock interview, computing the aggregate score and charging
    /// one unit of quota in the same transaction.
    ///
    /// Unanswered slots are allowed; the aggregate is the mean over scored
    /// answers, or absent when none were scored.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown or foreign session,
    /// `WrongSessionKind` for a single-question session, `AlreadyCompleted`
    /// when it was completed before, or a storage error.
    pub async fn complete_mock_interview(
        &self,
        session_id: SessionId,
        account_id: AccountId,
    ) -> Result<SessionView, ServiceError> {
        let mut session = self.owned_session(session_id, account_id).await?;
        if session.kind() != SessionKind::MockInterview {
            return Err(ServiceError::WrongSessionKind);
        }
        if session.is_completed() {
            return Err(ServiceError::AlreadyCompleted);
        }

        let answers = self.sessions.list_answers(session_id).await?;
        let aggregate = Session::aggregate_score(&answers);
        let now = self.clock.now();
        session.complete(now, aggregate)?;

        let question_ids: Vec<QuestionId> =
            answers.iter().map(|answer| answer.question_id()).collect();
        let event = UsageEvent::new(account_id, UsageAction::CompleteFullMockInterview, now);
        self.sessions
            .complete_session(&session, &question_ids, &event)
            .await?;

        let questions = self.questions.get_questions(&question_ids).await?;
        Ok(SessionView::hydrate(&session, &answers, &questions))
    }

    /// Fetch a session with its answers.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for an unknown account, `NotFound` for an
    /// unknown or foreign session, or a storage error.
    pub async fn get_session(
        &self,
        session_id: SessionId,
        account_id: AccountId,
    ) -> Result<SessionView, ServiceError> {
        self.resolve_account(account_id).await?;
        let session = self.owned_session(session_id, account_id).await?;
        let answers = self.sessions.list_answers(session_id).await?;
        let question_ids: Vec<QuestionId> =
            answers.iter().map(|answer| answer.question_id()).collect();
        let questions = self.questions.get_questions(&question_ids).await?;
        Ok(SessionView::hydrate(&session, &answers, &questions))
    }
}
