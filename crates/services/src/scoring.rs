use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use practice_core::model::{Feedback, Question};

/// Errors emitted by scoring providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("scoring is not configured")]
    Disabled,
    #[error("scoring provider returned an empty response")]
    EmptyResponse,
    #[error("scoring request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("scoring provider returned a malformed payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Score and feedback for one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAnswer {
    pub score: u8,
    pub feedback: Feedback,
}

/// Evaluates an answer against its question.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Produce a 0-100 score with structured feedback.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError` when the provider is unavailable or its
    /// response cannot be interpreted.
    async fn score(&self, question: &Question, answer_text: &str)
    -> Result<ScoredAnswer, ScoringError>;
}

#[derive(Clone, Debug)]
pub struct ScoringConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ScoringConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PRACTICE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("PRACTICE_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("PRACTICE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let timeout = parse_timeout_secs(env::var("PRACTICE_AI_TIMEOUT_SECS").ok());
        Some(Self {
            base_url,
            api_key,
            model,
            timeout,
        })
    }
}

fn parse_timeout_secs(raw: Option<String>) -> Duration {
    raw.as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(ScoringConfig::DEFAULT_TIMEOUT, Duration::from_secs)
}

/// Chat-completions backed scoring provider.
#[derive(Clone)]
pub struct HttpScoringProvider {
    client: Client,
    config: Option<ScoringConfig>,
}

impl HttpScoringProvider {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ScoringConfig::from_env())
    }

    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed, which indicates a
    /// broken TLS backend rather than a runtime condition.
    #[must_use]
    pub fn new(config: Option<ScoringConfig>) -> Self {
        let timeout = config
            .as_ref()
            .map_or(ScoringConfig::DEFAULT_TIMEOUT, |c| c.timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("HTTP client construction");
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn prompt(question: &Question, answer_text: &str) -> String {
        format!(
            "You are an interview coach. Evaluate the candidate's answer to the \
             question below. Respond with JSON only, in the form \
             {{\"score\": <0-100 integer>, \"feedback\": {{\"overall\": \"...\", \
             \"strengths\": [\"...\"], \"improvements\": [\"...\"]}}}}.\n\n\
             Question: {}\n\nAnswer: {}",
            question.content(),
            answer_text
        )
    }

    fn parse_content(content: &str) -> Result<ScoredAnswer, ScoringError> {
        let payload: ScorePayload = serde_json::from_str(content.trim())
            .map_err(|e| ScoringError::MalformedPayload(e.to_string()))?;
        let score = u8::try_from(payload.score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| {
                ScoringError::MalformedPayload(format!("score out of range: {}", payload.score))
            })?;
        Ok(ScoredAnswer {
            score,
            feedback: Feedback {
                overall: payload.feedback.overall,
                strengths: payload.feedback.strengths,
                improvements: payload.feedback.improvements,
            },
        })
    }
}

#[async_trait]
impl ScoringProvider for HttpScoringProvider {
    async fn score(
        &self,
        question: &Question,
        answer_text: &str,
    ) -> Result<ScoredAnswer, ScoringError> {
        let config = self.config.as_ref().ok_or(ScoringError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::prompt(question, answer_text),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoringError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ScoringError::EmptyResponse)?;

        Self::parse_content(&content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: i64,
    feedback: FeedbackPayload,
}

#[derive(Debug, Deserialize)]
struct FeedbackPayload {
    overall: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_falls_back_to_the_default() {
        assert_eq!(parse_timeout_secs(None), ScoringConfig::DEFAULT_TIMEOUT);
        assert_eq!(
            parse_timeout_secs(Some("not a number".into())),
            ScoringConfig::DEFAULT_TIMEOUT
        );
        assert_eq!(
            parse_timeout_secs(Some("0".into())),
            ScoringConfig::DEFAULT_TIMEOUT
        );
    }

    #[test]
    fn timeout_parses_whole_seconds() {
        assert_eq!(parse_timeout_secs(Some("5".into())), Duration::from_secs(5));
        assert_eq!(
            parse_timeout_secs(Some(" 120 ".into())),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn provider_accepts_a_custom_timeout() {
        let provider = HttpScoringProvider::new(Some(ScoringConfig {
            base_url: "http://localhost:1".into(),
            api_key: "test-key".into(),
            model: "test-model".into(),
            timeout: Duration::from_secs(2),
        }));
        assert!(provider.enabled());
    }

    #[test]
    fn parses_a_well_formed_score_payload() {
        let content = r#"{"score": 85, "feedback": {"overall": "Good answer", "strengths": ["clear"], "improvements": []}}"#;
        let scored = HttpScoringProvider::parse_content(content).unwrap();
        assert_eq!(scored.score, 85);
        assert_eq!(scored.feedback.overall, "Good answer");
        assert_eq!(scored.feedback.strengths, vec!["clear".to_string()]);
    }

    #[test]
    fn rejects_scores_outside_the_scale() {
        let content = r#"{"score": 120, "feedback": {"overall": "??"}}"#;
        let err = HttpScoringProvider::parse_content(content).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_non_json_content() {
        let err = HttpScoringProvider::parse_content("Sure! Here is my review.").unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn unconfigured_provider_reports_disabled() {
        let provider = HttpScoringProvider::new(None);
        assert!(!provider.enabled());
        let question = Question::new(
            practice_core::model::QuestionId::new(1),
            "Tell me about yourself",
            practice_core::model::Difficulty::Easy,
            Vec::new(),
            true,
            0,
        )
        .unwrap();
        let err = provider.score(&question, "hi").await.unwrap_err();
        assert!(matches!(err, ScoringError::Disabled));
    }
}
