use std::fmt;
use thiserror::Error;

use crate::model::ids::{CategoryId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question content cannot be empty")]
    EmptyContent,

    #[error("unknown difficulty: {0}")]
    InvalidDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Question difficulty rating used for pool filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Storage tag for this difficulty.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses a storage tag back into a difficulty.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidDifficulty` for an unrecognized tag.
    pub fn parse(s: &str) -> Result<Self, QuestionError> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuestionError::InvalidDifficulty(other.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Read-only snapshot of an interview question from the catalog.
///
/// The practice engine never edits question content; the only write it
/// performs is bumping `times_used` when a session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    content: String,
    difficulty: Difficulty,
    category_ids: Vec<CategoryId>,
    active: bool,
    times_used: u64,
}

impl Question {
    /// Builds a question snapshot, validating that content is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyContent` for blank content.
    pub fn new(
        id: QuestionId,
        content: impl Into<String>,
        difficulty: Difficulty,
        category_ids: Vec<CategoryId>,
        active: bool,
        times_used: u64,
    ) -> Result<Self, QuestionError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(QuestionError::EmptyContent);
        }
        Ok(Self {
            id,
            content,
            difficulty,
            category_ids,
            active,
            times_used,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn category_ids(&self) -> &[CategoryId] {
        &self.category_ids
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn times_used(&self) -> u64 {
        self.times_used
    }
}

//
// ─── FILTER ────────────────────────────────────────────────────────────────────
//

/// Conjunctive filter over the question pool.
///
/// An empty `category_ids` or `difficulties` list means "no constraint" for
/// that axis; a non-empty list matches if the question satisfies at least one
/// entry. Inactive questions never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category_ids: Vec<CategoryId>,
    pub difficulties: Vec<Difficulty>,
}

impl QuestionFilter {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        if !question.is_active() {
            return false;
        }
        if !self.category_ids.is_empty()
            && !question
                .category_ids()
                .iter()
                .any(|c| self.category_ids.contains(c))
        {
            return false;
        }
        if !self.difficulties.is_empty() && !self.difficulties.contains(&question.difficulty()) {
            return false;
        }
        true
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn build_question(id: u64, difficulty: Difficulty, categories: &[u64], active: bool) -> Question {
        Question::new(
            QuestionId::new(id),
            "Tell me about a project you are proud of.",
            difficulty,
            categories.iter().copied().map(CategoryId::new).collect(),
            active,
            0,
        )
        .unwrap()
    }

    #[test]
    fn empty_content_rejected() {
        let err = Question::new(
            QuestionId::new(1),
            "   ",
            Difficulty::Easy,
            Vec::new(),
            true,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::EmptyContent));
    }

    #[test]
    fn empty_filter_matches_any_active_question() {
        let filter = QuestionFilter::default();
        assert!(filter.matches(&build_question(1, Difficulty::Hard, &[3], true)));
        assert!(!filter.matches(&build_question(2, Difficulty::Hard, &[3], false)));
    }

    #[test]
    fn category_filter_is_disjunctive_within_list() {
        let filter = QuestionFilter {
            category_ids: vec![CategoryId::new(1), CategoryId::new(2)],
            difficulties: Vec::new(),
        };
        assert!(filter.matches(&build_question(1, Difficulty::Easy, &[2, 9], true)));
        assert!(!filter.matches(&build_question(2, Difficulty::Easy, &[9], true)));
    }

    #[test]
    fn difficulty_and_category_apply_as_conjunction() {
        let filter = QuestionFilter {
            category_ids: vec![CategoryId::new(1)],
            difficulties: vec![Difficulty::Easy, Difficulty::Hard],
        };
        assert!(filter.matches(&build_question(1, Difficulty::Hard, &[1], true)));
        assert!(!filter.matches(&build_question(2, Difficulty::Medium, &[1], true)));
        assert!(!filter.matches(&build_question(3, Difficulty::Hard, &[4], true)));
    }

    #[test]
    fn difficulty_tags_round_trip() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(d.as_str()).unwrap(), d);
        }
        assert!(Difficulty::parse("impossible").is_err());
    }
}
