#![forbid(unsafe_code)]

pub mod error;
pub mod practice_services;
pub mod quota;
pub mod scoring;
pub mod selector;
pub mod sessions;
pub mod settings_service;

pub use practice_core::Clock;

pub use error::{PracticeServicesError, ServiceError};
pub use practice_services::PracticeServices;
pub use quota::QuotaGate;
pub use scoring::{HttpScoringProvider, ScoredAnswer, ScoringConfig, ScoringError, ScoringProvider};
pub use selector::QuestionSelector;
pub use settings_service::SettingsService;

pub use sessions::{
    AnswerView, PracticeSessionService, QuestionView, SessionView, SubmissionResult,
    SubmissionService,
};
