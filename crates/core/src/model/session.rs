use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{AccountId, SessionId};
use crate::model::Answer;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a session must hold at least one question")]
    NoQuestions,

    #[error("single-question sessions hold exactly one question, got {0}")]
    SingleQuestionCount(u32),

    #[error("session is already completed")]
    AlreadyCompleted,

    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("overall score {0} is out of the 0..=100 range")]
    ScoreOutOfRange(f64),

    #[error("unknown session kind: {0}")]
    InvalidKind(String),

    #[error("unknown session status: {0}")]
    InvalidStatus(String),
}

//
// ─── KIND & STATUS ─────────────────────────────────────────────────────────────
//

/// Which flavor of practice attempt a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// One named question, self-completing on submission.
    SingleQuestion,
    /// A sampled multi-question set with an explicit completion call.
    MockInterview,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::SingleQuestion => "single_question",
            SessionKind::MockInterview => "mock_interview",
        }
    }

    /// Parses a storage tag back into a kind.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidKind` for an unrecognized tag.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        match s {
            "single_question" => Ok(SessionKind::SingleQuestion),
            "mock_interview" => Ok(SessionKind::MockInterview),
            other => Err(SessionError::InvalidKind(other.to_string())),
        }
    }
}

/// Session state machine: `InProgress` → `Completed`, nothing else.
///
/// There is deliberately no `Abandoned` or `Expired` state; a session left
/// `InProgress` simply never consumes quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parses a storage tag back into a status.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStatus` for an unrecognized tag.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(SessionError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One practice attempt by one caller.
///
/// `question_count` is fixed at creation and always equals the number of
/// answer slots attached to the session. Status moves from `InProgress` to
/// `Completed` exactly once; the overall score is set at that transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    account_id: AccountId,
    kind: SessionKind,
    status: SessionStatus,
    question_count: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    overall_score: Option<f64>,
}

impl Session {
    /// Creates a new in-progress session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for a zero count, or
    /// `SessionError::SingleQuestionCount` when a single-question session
    /// is created with more than one slot.
    pub fn new(
        id: SessionId,
        account_id: AccountId,
        kind: SessionKind,
        question_count: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if question_count == 0 {
            return Err(SessionError::NoQuestions);
        }
        if kind == SessionKind::SingleQuestion && question_count != 1 {
            return Err(SessionError::SingleQuestionCount(question_count));
        }
        Ok(Self {
            id,
            account_id,
            kind,
            status: SessionStatus::InProgress,
            question_count,
            started_at,
            completed_at: None,
            overall_score: None,
        })
    }

    /// Rehydrates a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if counts, timestamps, or the score violate
    /// the invariants above.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        account_id: AccountId,
        kind: SessionKind,
        status: SessionStatus,
        question_count: u32,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        overall_score: Option<f64>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(id, account_id, kind, question_count, started_at)?;
        if status == SessionStatus::Completed {
            let completed_at = completed_at.ok_or(SessionError::InvalidTimeRange)?;
            session.complete(completed_at, overall_score)?;
        }
        Ok(session)
    }

    /// Transitions the session to `Completed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyCompleted` on a second completion,
    /// `SessionError::InvalidTimeRange` if `completed_at` precedes the start,
    /// or `SessionError::ScoreOutOfRange` for a score outside 0..=100.
    pub fn complete(
        &mut self,
        completed_at: DateTime<Utc>,
        overall_score: Option<f64>,
    ) -> Result<(), SessionError> {
        if self.status == SessionStatus::Completed {
            return Err(SessionError::AlreadyCompleted);
        }
        if completed_at < self.started_at {
            return Err(SessionError::InvalidTimeRange);
        }
        if let Some(score) = overall_score {
            if !(0.0..=100.0).contains(&score) {
                return Err(SessionError::ScoreOutOfRange(score));
            }
        }
        self.status = SessionStatus::Completed;
        self.completed_at = Some(completed_at);
        self.overall_score = overall_score;
        Ok(())
    }

    /// Arithmetic mean over the answers that carry a score.
    ///
    /// Unanswered slots are excluded from the mean, not counted as zero.
    /// Returns `None` when no answer has been scored.
    #[must_use]
    pub fn aggregate_score(answers: &[Answer]) -> Option<f64> {
        let scored: Vec<f64> = answers
            .iter()
            .filter_map(|a| a.score().map(f64::from))
            .collect();
        if scored.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn overall_score(&self) -> Option<f64> {
        self.overall_score
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerId, Feedback, QuestionId};
    use crate::time::fixed_now;

    fn build_session(kind: SessionKind, count: u32) -> Session {
        Session::new(
            SessionId::generate(),
            AccountId::new(1),
            kind,
            count,
            fixed_now(),
        )
        .unwrap()
    }

    fn scored_answer(session: &Session, ordinal: u32, score: u8) -> Answer {
        let mut answer = Answer::new(
            AnswerId::new(u64::from(ordinal)),
            session.id(),
            QuestionId::new(u64::from(ordinal)),
            ordinal,
        )
        .unwrap();
        answer.record_submission("answer", fixed_now()).unwrap();
        answer.record_result(score, Feedback::fallback()).unwrap();
        answer
    }

    #[test]
    fn single_question_requires_count_of_one() {
        let err = Session::new(
            SessionId::generate(),
            AccountId::new(1),
            SessionKind::SingleQuestion,
            3,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::SingleQuestionCount(3)));
    }

    #[test]
    fn zero_questions_rejected() {
        let err = Session::new(
            SessionId::generate(),
            AccountId::new(1),
            SessionKind::MockInterview,
            0,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::NoQuestions));
    }

    #[test]
    fn complete_sets_terminal_fields_once() {
        let mut session = build_session(SessionKind::MockInterview, 3);
        assert!(!session.is_completed());

        let at = fixed_now() + chrono::Duration::minutes(30);
        session.complete(at, Some(72.5)).unwrap();
        assert!(session.is_completed());
        assert_eq!(session.completed_at(), Some(at));
        assert_eq!(session.overall_score(), Some(72.5));

        let err = session.complete(at, Some(72.5)).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyCompleted));
    }

    #[test]
    fn complete_rejects_time_travel() {
        let mut session = build_session(SessionKind::MockInterview, 2);
        let err = session
            .complete(fixed_now() - chrono::Duration::minutes(1), None)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTimeRange));
    }

    #[test]
    fn aggregate_ignores_unscored_answers() {
        let session = build_session(SessionKind::MockInterview, 3);
        let mut answers = vec![
            scored_answer(&session, 1, 80),
            scored_answer(&session, 2, 60),
        ];
        answers.push(
            Answer::new(AnswerId::new(3), session.id(), QuestionId::new(3), 3).unwrap(),
        );

        assert_eq!(Session::aggregate_score(&answers), Some(70.0));
    }

    #[test]
    fn aggregate_of_unscored_session_is_none() {
        let session = build_session(SessionKind::MockInterview, 1);
        let answers =
            vec![Answer::new(AnswerId::new(1), session.id(), QuestionId::new(1), 1).unwrap()];
        assert_eq!(Session::aggregate_score(&answers), None);
    }

    #[test]
    fn persisted_completed_session_round_trips() {
        let id = SessionId::generate();
        let completed = fixed_now() + chrono::Duration::minutes(10);
        let session = Session::from_persisted(
            id,
            AccountId::new(9),
            SessionKind::MockInterview,
            SessionStatus::Completed,
            2,
            fixed_now(),
            Some(completed),
            Some(55.0),
        )
        .unwrap();
        assert!(session.is_completed());
        assert_eq!(session.overall_score(), Some(55.0));

        let err = Session::from_persisted(
            id,
            AccountId::new(9),
            SessionKind::MockInterview,
            SessionStatus::Completed,
            2,
            fixed_now(),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTimeRange));
    }

    #[test]
    fn kind_and_status_tags_round_trip() {
        for kind in [SessionKind::SingleQuestion, SessionKind::MockInterview] {
            assert_eq!(SessionKind::parse(kind.as_str()).unwrap(), kind);
        }
        for status in [SessionStatus::InProgress, SessionStatus::Completed] {
            assert_eq!(SessionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SessionKind::parse("group_interview").is_err());
    }
}
