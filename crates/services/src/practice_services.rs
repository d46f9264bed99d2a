use std::sync::Arc;

use practice_core::Clock;
use storage::Storage;

use crate::error::PracticeServicesError;
use crate::quota::QuotaGate;
use crate::scoring::{HttpScoringProvider, ScoringProvider};
use crate::selector::QuestionSelector;
use crate::sessions::{PracticeSessionService, SubmissionService};
use crate::settings_service::SettingsService;

/// Assembles the practice engine's services over one storage backend.
#[derive(Clone)]
pub struct PracticeServices {
    sessions: Arc<PracticeSessionService>,
    submissions: Arc<SubmissionService>,
    settings: Arc<SettingsService>,
}

impl PracticeServices {
    /// Build services backed by `SQLite` storage, with scoring configured
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, PracticeServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let provider = Arc::new(HttpScoringProvider::from_env());
        Ok(Self::assemble(&storage, clock, provider))
    }

    /// Build services over the given storage and scoring provider.
    #[must_use]
    pub fn assemble(
        storage: &Storage,
        clock: Clock,
        provider: Arc<dyn ScoringProvider>,
    ) -> Self {
        let settings = SettingsService::new(Arc::clone(&storage.settings));
        let quota = QuotaGate::new(clock, Arc::clone(&storage.usage), settings.clone());
        let selector = QuestionSelector::new(Arc::clone(&storage.questions));

        let sessions = Arc::new(PracticeSessionService::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.accounts),
            quota,
            selector,
        ));
        let submissions = Arc::new(SubmissionService::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.accounts),
            provider,
        ));

        Self {
            sessions,
            submissions,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &PracticeSessionService {
        &self.sessions
    }

    #[must_use]
    pub fn submissions(&self) -> &SubmissionService {
        &self.submissions
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }
}
