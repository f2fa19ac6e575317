//! Advice requests: prompt construction and the single provider round-trip.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bmi::BmiResult;
use crate::error::AdviceError;

const PERSONA: &str = "Act as a professional dietitian and health expert.";
const DEFAULT_QUESTION: &str = "Please give me diet and fitness tips.";

/// A generative-text backend.
///
/// Implementations perform exactly one call per `generate` and return the raw
/// text, which may be empty; emptiness is judged by [`AdviceRequester`].
pub trait TextProvider: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, AdviceError>>;
}

/// Built fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvicePrompt {
    pub bmi_result: BmiResult,
    pub user_question: Option<String>,
}

impl AdvicePrompt {
    pub fn new(bmi_result: BmiResult, user_question: Option<&str>) -> Self {
        let user_question = user_question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Self {
            bmi_result,
            user_question,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{} My BMI is {:.1}, which falls in the {} category. {}",
            PERSONA,
            self.bmi_result.value,
            self.bmi_result.category.label(),
            self.user_question.as_deref().unwrap_or(DEFAULT_QUESTION)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdviceResponse {
    pub text: String,
}

#[derive(Clone)]
pub struct AdviceRequester {
    provider: Arc<dyn TextProvider>,
    timeout: Duration,
}

impl AdviceRequester {
    pub fn new(provider: Arc<dyn TextProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn request_advice(
        &self,
        bmi_result: &BmiResult,
        user_question: Option<&str>,
    ) -> Result<AdviceResponse, AdviceError> {
        let prompt = AdvicePrompt::new(*bmi_result, user_question).render();
        debug!(prompt_len = prompt.len(), bmi = bmi_result.value, "Requesting advice");

        let text = match tokio::time::timeout(self.timeout, self.provider.generate(&prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Advice provider timed out");
                return Err(AdviceError::Timeout(self.timeout));
            }
        };

        if text.trim().is_empty() {
            warn!("Advice provider returned no text");
            return Err(AdviceError::EmptyResponse);
        }

        info!(response_len = text.len(), "Advice received");
        Ok(AdviceResponse { text })
    }
}
