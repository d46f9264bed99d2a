use std::sync::Arc;

use practice_core::Clock;
use practice_core::model::{
    AccountId, Answer, AnswerId, Feedback, QuestionId, Session, SessionId, SessionKind,
    UsageAction, UsageEvent,
};
use storage::repository::{AccountRepository, QuestionRepository, SessionRepository};

use crate::error::ServiceError;
use crate::scoring::{ScoredAnswer, ScoringProvider};
use crate::sessions::view::SessionView;

/// Outcome of one answer submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub answer_id: AnswerId,
    pub score: u8,
    pub feedback: Feedback,
    /// Set when this submission closed a single-question session.
    pub session_completed: bool,
    pub overall_score: Option<f64>,
}

/// Accepts answer text, coordinates scoring, and auto-completes
/// single-question sessions.
#[derive(Clone)]
pub struct SubmissionService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    accounts: Arc<dyn AccountRepository>,
    provider: Arc<dyn ScoringProvider>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        questions: Arc<dyn QuestionRepository>,
        accounts: Arc<dyn AccountRepository>,
        provider: Arc<dyn ScoringProvider>,
    ) -> Self {
        Self {
            clock,
            sessions,
            questions,
            accounts,
            provider,
        }
    }

    /// Submit (or resubmit) an answer to one question in a session.
    ///
    /// The raw text is persisted before scoring, so a provider outage never
    /// loses what the candidate wrote. Resubmitting while the session is
    /// still in progress overwrites the previous text and score. For
    /// single-question sessions a successful submission also completes the
    /// session and charges one unit of quota.
    ///
    /// `question_id` may be omitted for single-question sessions, which have
    /// exactly one slot; mock interviews must name the question.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for an unknown account, `NotFound` for an
    /// unknown or foreign session, `AlreadyCompleted` when the session has
    /// been closed, `NotFound` when the named question has no slot in the
    /// session, `WrongSessionKind` when `question_id` is omitted for a mock
    /// interview, an `Answer` error for blank text, or a storage error.
    pub async fn submit(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        question_id: Option<QuestionId>,
        text: &str,
    ) -> Result<SubmissionResult, ServiceError> {
        self.accounts
            .get_account(account_id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        let mut session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(ServiceError::NotFound("session"))?;
        if session.account_id() != account_id {
            return Err(ServiceError::NotFound("session"));
        }
        if session.is_completed() {
            return Err(ServiceError::AlreadyCompleted);
        }

        let mut answer = self.locate_slot(&session, question_id).await?;
        answer.record_submission(text, self.clock.now())?;
        self.sessions.update_answer(&answer).await?;

        let question = self
            .questions
            .get_question(answer.question_id())
            .await?
            .ok_or(ServiceError::NotFound("question"))?;

        let scored = match self.provider.score(&question, text).await {
            Ok(scored) => scored,
            Err(error) => {
                tracing::warn!(
                    session_id = %session.id(),
                    account_id = %account_id,
                    %error,
                    "scoring failed, recording fallback feedback"
                );
                ScoredAnswer {
                    score: 0,
                    feedback: Feedback::fallback(),
                }
            }
        };
        answer.record_result(scored.score, scored.feedback.clone())?;
        self.sessions.update_answer(&answer).await?;

        let mut session_completed = false;
        let mut overall_score = None;
        if session.kind() == SessionKind::SingleQuestion {
            let now = self.clock.now();
            let aggregate = Session::aggregate_score(std::slice::from_ref(&answer));
            session.complete(now, aggregate)?;
            let event = UsageEvent::new(account_id, UsageAction::CompleteSingleQuestion, now);
            self.sessions
                .complete_session(&session, &[answer.question_id()], &event)
                .await?;
            session_completed = true;
            overall_score = session.overall_score();
        }

        Ok(SubmissionResult {
            answer_id: answer.id(),
            score: scored.score,
            feedback: scored.feedback,
            session_completed,
            overall_score,
        })
    }

    /// Hydrated view of a session after submissions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown or foreign session, or a storage
    /// error.
    pub async fn session_view(
        &self,
        session_id: SessionId,
        account_id: AccountId,
    ) -> Result<SessionView, ServiceError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(ServiceError::NotFound("session"))?;
        if session.account_id() != account_id {
            return Err(ServiceError::NotFound("session"));
        }
        let answers = self.sessions.list_answers(session_id).await?;
        let question_ids: Vec<QuestionId> =
            answers.iter().map(|answer| answer.question_id()).collect();
        let questions = self.questions.get_questions(&question_ids).await?;
        Ok(SessionView::hydrate(&session, &answers, &questions))
    }

    async fn locate_slot(
        &self,
        session: &Session,
        question_id: Option<QuestionId>,
    ) -> Result<Answer, ServiceError> {
        match question_id {
            Some(question_id) => self
                .sessions
                .find_answer(session.id(), question_id)
                .await?
                .ok_or(ServiceError::NotFound("answer slot")),
            None => {
                if session.kind() != SessionKind::SingleQuestion {
                    return Err(ServiceError::WrongSessionKind);
                }
                let answers = self.sessions.list_answers(session.id()).await?;
                answers
                    .into_iter()
                    .next()
                    .ok_or(ServiceError::NotFound("answer slot"))
            }
        }
    }
}
