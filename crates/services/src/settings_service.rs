use std::sync::Arc;

use storage::repository::SettingsRepository;

/// Read-side access to named configuration values.
///
/// Lookups are best-effort: a missing key, a storage failure, or an
/// unparseable value all fall back to the caller-supplied default so that
/// configuration problems never block a practice session.
#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    #[must_use]
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Load a `u32` setting, falling back to `default` when unset or invalid.
    pub async fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.repo.get_value(key).await {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(key, raw, "setting is not a valid u32, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(error) => {
                tracing::warn!(key, %error, "failed to load setting, using default");
                default
            }
        }
    }
}
