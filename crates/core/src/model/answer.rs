use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId, SessionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer ordinal must be >= 1")]
    InvalidOrdinal,

    #[error("answer text cannot be empty")]
    EmptyText,

    #[error("score {0} is out of the 0..=100 range")]
    ScoreOutOfRange(u16),

    #[error("answer has a score but no feedback")]
    MissingFeedback,
}

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

/// Structured feedback returned by the scoring provider for one answer.
///
/// Persisted as a JSON column. The schema is strict: free-form provider
/// output that does not deserialize into this shape is discarded in favor of
/// [`Feedback::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub overall: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl Feedback {
    /// Deterministic substitute used when the scoring provider fails.
    ///
    /// Paired with a score of 0 so that a provider outage never blocks a
    /// session from progressing.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            overall: "Your answer was saved but could not be analyzed automatically. \
                      You can resubmit it later for a full evaluation."
                .to_string(),
            strengths: Vec::new(),
            improvements: Vec::new(),
        }
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One question slot within a session.
///
/// Slots are pre-allocated at session creation with contiguous 1-based
/// ordinals; each moves from "unanswered" to "answered + scored" on
/// submission. Re-submitting to a scored slot overwrites the previous
/// text, score, and feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    id: AnswerId,
    session_id: SessionId,
    question_id: QuestionId,
    ordinal: u32,
    answer_text: Option<String>,
    answered_at: Option<DateTime<Utc>>,
    score: Option<u8>,
    feedback: Option<Feedback>,
}

impl Answer {
    /// Creates a fresh, unanswered slot.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidOrdinal` if `ordinal` is 0.
    pub fn new(
        id: AnswerId,
        session_id: SessionId,
        question_id: QuestionId,
        ordinal: u32,
    ) -> Result<Self, AnswerError> {
        if ordinal == 0 {
            return Err(AnswerError::InvalidOrdinal);
        }
        Ok(Self {
            id,
            session_id,
            question_id,
            ordinal,
            answer_text: None,
            answered_at: None,
            score: None,
            feedback: None,
        })
    }

    /// Rehydrates an answer from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if the ordinal is 0, the score is out of range,
    /// or a score is present without feedback.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AnswerId,
        session_id: SessionId,
        question_id: QuestionId,
        ordinal: u32,
        answer_text: Option<String>,
        answered_at: Option<DateTime<Utc>>,
        score: Option<u16>,
        feedback: Option<Feedback>,
    ) -> Result<Self, AnswerError> {
        if ordinal == 0 {
            return Err(AnswerError::InvalidOrdinal);
        }
        let score = match score {
            None => None,
            Some(s) => match u8::try_from(s) {
                Ok(value) if value <= 100 => Some(value),
                _ => return Err(AnswerError::ScoreOutOfRange(s)),
            },
        };
        if score.is_some() && feedback.is_none() {
            return Err(AnswerError::MissingFeedback);
        }
        Ok(Self {
            id,
            session_id,
            question_id,
            ordinal,
            answer_text,
            answered_at,
            score,
            feedback,
        })
    }

    /// Stores the caller's submitted text and timestamp.
    ///
    /// Called before the scoring round-trip so a provider failure never
    /// loses the submission.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::EmptyText` for blank text.
    pub fn record_submission(
        &mut self,
        text: impl Into<String>,
        answered_at: DateTime<Utc>,
    ) -> Result<(), AnswerError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AnswerError::EmptyText);
        }
        self.answer_text = Some(text);
        self.answered_at = Some(answered_at);
        Ok(())
    }

    /// Stores the provider's score and feedback, overwriting any prior result.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::ScoreOutOfRange` for scores above 100.
    pub fn record_result(&mut self, score: u8, feedback: Feedback) -> Result<(), AnswerError> {
        if score > 100 {
            return Err(AnswerError::ScoreOutOfRange(u16::from(score)));
        }
        self.score = Some(score);
        self.feedback = Some(feedback);
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> AnswerId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }

    #[must_use]
    pub fn answered_at(&self) -> Option<DateTime<Utc>> {
        self.answered_at
    }

    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.score
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_slot(ordinal: u32) -> Answer {
        Answer::new(
            AnswerId::new(1),
            SessionId::generate(),
            QuestionId::new(7),
            ordinal,
        )
        .unwrap()
    }

    #[test]
    fn ordinal_zero_rejected() {
        let err = Answer::new(
            AnswerId::new(1),
            SessionId::generate(),
            QuestionId::new(7),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AnswerError::InvalidOrdinal));
    }

    #[test]
    fn submission_then_result() {
        let mut answer = build_slot(1);
        assert!(!answer.is_scored());

        answer.record_submission("I would use a hash map.", fixed_now()).unwrap();
        assert_eq!(answer.answer_text(), Some("I would use a hash map."));
        assert_eq!(answer.answered_at(), Some(fixed_now()));
        assert!(!answer.is_scored());

        answer
            .record_result(
                85,
                Feedback {
                    overall: "Solid".into(),
                    strengths: vec!["clarity".into()],
                    improvements: vec![],
                },
            )
            .unwrap();
        assert_eq!(answer.score(), Some(85));
        assert!(answer.is_scored());
    }

    #[test]
    fn blank_submission_rejected() {
        let mut answer = build_slot(1);
        let err = answer.record_submission("  \n", fixed_now()).unwrap_err();
        assert!(matches!(err, AnswerError::EmptyText));
        assert!(answer.answer_text().is_none());
    }

    #[test]
    fn resubmission_overwrites_previous_result() {
        let mut answer = build_slot(2);
        answer.record_submission("first try", fixed_now()).unwrap();
        answer.record_result(40, Feedback::fallback()).unwrap();

        answer.record_submission("second try", fixed_now()).unwrap();
        answer
            .record_result(
                90,
                Feedback {
                    overall: "Much better".into(),
                    strengths: vec![],
                    improvements: vec![],
                },
            )
            .unwrap();

        assert_eq!(answer.answer_text(), Some("second try"));
        assert_eq!(answer.score(), Some(90));
    }

    #[test]
    fn persisted_score_out_of_range_rejected() {
        let err = Answer::from_persisted(
            AnswerId::new(1),
            SessionId::generate(),
            QuestionId::new(1),
            1,
            Some("text".into()),
            Some(fixed_now()),
            Some(101),
            Some(Feedback::fallback()),
        )
        .unwrap_err();
        assert!(matches!(err, AnswerError::ScoreOutOfRange(101)));
    }

    #[test]
    fn fallback_feedback_is_nonempty() {
        let fb = Feedback::fallback();
        assert!(!fb.overall.is_empty());
        assert!(fb.strengths.is_empty());
        assert!(fb.improvements.is_empty());
    }
}
