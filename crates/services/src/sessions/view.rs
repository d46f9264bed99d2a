use chrono::{DateTime, Utc};

use practice_core::model::{
    Answer, AnswerId, CategoryId, Difficulty, Feedback, Question, QuestionId, Session, SessionId,
    SessionKind, SessionStatus,
};

/// Snapshot of the question bound to an answer slot, so callers can render a
/// session without further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub content: String,
    pub difficulty: Difficulty,
    pub category_ids: Vec<CategoryId>,
}

impl QuestionView {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            content: question.content().to_string(),
            difficulty: question.difficulty(),
            category_ids: question.category_ids().to_vec(),
        }
    }
}

/// One answer slot as presented to callers, with its question snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerView {
    pub id: AnswerId,
    pub question: QuestionView,
    pub ordinal: u32,
    pub answer_text: Option<String>,
    pub answered_at: Option<DateTime<Utc>>,
    pub score: Option<u8>,
    pub feedback: Option<Feedback>,
}

impl AnswerView {
    fn new(answer: &Answer, question: QuestionView) -> Self {
        Self {
            id: answer.id(),
            question,
            ordinal: answer.ordinal(),
            answer_text: answer.answer_text().map(str::to_string),
            answered_at: answer.answered_at(),
            score: answer.score(),
            feedback: answer.feedback().cloned(),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question.id
    }
}

/// A session with its answer slots, ordered by ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub id: SessionId,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub question_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub overall_score: Option<f64>,
    pub answers: Vec<AnswerView>,
}

impl SessionView {
    /// Joins answers to their question snapshots by id.
    ///
    /// Answers whose question is missing from `questions` are skipped;
    /// callers pass the full batch, so in practice every slot is populated.
    #[must_use]
    pub fn hydrate(session: &Session, answers: &[Answer], questions: &[Question]) -> Self {
        let views = answers
            .iter()
            .filter_map(|answer| {
                questions
                    .iter()
                    .find(|question| question.id() == answer.question_id())
                    .map(|question| AnswerView::new(answer, QuestionView::from_question(question)))
            })
            .collect();
        Self {
            id: session.id(),
            kind: session.kind(),
            status: session.status(),
            question_count: session.question_count(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
            overall_score: session.overall_score(),
            answers: views,
        }
    }
}
