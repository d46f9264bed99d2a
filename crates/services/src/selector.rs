use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use practice_core::model::{Question, QuestionFilter};
use storage::repository::QuestionRepository;

use crate::error::ServiceError;

/// Draws questions for a mock interview from the active pool.
#[derive(Clone)]
pub struct QuestionSelector {
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionSelector {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Sample `count` distinct questions matching `filter`, uniformly and
    /// without replacement.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InsufficientPool` when fewer than `count`
    /// active questions match, or a storage error if the pool cannot be
    /// listed.
    pub async fn select(
        &self,
        filter: &QuestionFilter,
        count: u32,
    ) -> Result<Vec<Question>, ServiceError> {
        let mut pool = self.questions.list_questions(filter).await?;
        let available = u32::try_from(pool.len()).unwrap_or(u32::MAX);
        if available < count {
            return Err(ServiceError::InsufficientPool {
                requested: count,
                available,
            });
        }

        pool.shuffle(&mut rng());
        pool.truncate(count as usize);
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use practice_core::model::{CategoryId, Difficulty, QuestionId};
    use storage::Storage;

    async fn seed(storage: &Storage, id: u64, difficulty: Difficulty) {
        let question = Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            difficulty,
            vec![CategoryId::new(1)],
            true,
            0,
        )
        .unwrap();
        storage.questions.upsert_question(&question).await.unwrap();
    }

    #[tokio::test]
    async fn selects_distinct_questions_from_the_pool() {
        let storage = Storage::in_memory();
        for id in 1..=10 {
            seed(&storage, id, Difficulty::Medium).await;
        }
        let selector = QuestionSelector::new(Arc::clone(&storage.questions));

        let picked = selector.select(&QuestionFilter::default(), 5).await.unwrap();
        assert_eq!(picked.len(), 5);
        let ids: HashSet<_> = picked.iter().map(Question::id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn rejects_when_the_pool_is_too_small() {
        let storage = Storage::in_memory();
        seed(&storage, 1, Difficulty::Easy).await;
        seed(&storage, 2, Difficulty::Hard).await;
        let selector = QuestionSelector::new(Arc::clone(&storage.questions));

        let filter = QuestionFilter {
            category_ids: Vec::new(),
            difficulties: vec![Difficulty::Easy],
        };
        let err = selector.select(&filter, 2).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientPool {
                requested: 2,
                available: 1,
            }
        ));
    }
}
