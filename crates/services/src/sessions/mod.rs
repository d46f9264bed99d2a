mod service;
mod submission;
mod view;

// Public API of the session subsystem.
pub use crate::error::ServiceError;
pub use service::PracticeSessionService;
pub use submission::{SubmissionResult, SubmissionService};
pub use view::{AnswerView, QuestionView, SessionView};
