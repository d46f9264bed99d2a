mod account;
mod answer;
mod ids;
mod question;
mod session;
mod usage;

pub use account::{Account, SubscriptionTier, TierParseError};
pub use answer::{Answer, AnswerError, Feedback};
pub use ids::{AccountId, AnswerId, CategoryId, ParseIdError, QuestionId, SessionId};
pub use question::{Difficulty, Question, QuestionError, QuestionFilter};
pub use session::{Session, SessionError, SessionKind, SessionStatus};
pub use usage::{UsageAction, UsageEvent};
