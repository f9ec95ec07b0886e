//! Bridges rig-core completion models onto `LlmProvider`.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionError, CompletionModel, Message};
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::costs::model_cost;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// Any rig `CompletionModel`, exposed as an `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

/// System messages travel as the preamble instead.
fn to_rig_message(message: ChatMessage) -> Option<Message> {
    match message.role {
        Role::System => None,
        Role::User => Some(Message::user(message.content)),
        Role::Assistant => Some(Message::assistant(message.content)),
    }
}

fn map_error(model: &str, err: CompletionError) -> LlmError {
    let reason = err.to_string();
    let lower = reason.to_ascii_lowercase();
    let provider = model.to_string();

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
        LlmError::RateLimited {
            provider,
            retry_after: None,
        }
    } else if lower.contains("401") || lower.contains("authentication") {
        LlmError::AuthFailed { provider }
    } else if matches!(
        err,
        CompletionError::ResponseError(_) | CompletionError::JsonError(_)
    ) {
        LlmError::InvalidResponse { provider, reason }
    } else {
        LlmError::RequestFailed { provider, reason }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        model_cost(&self.model_name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let preamble = request.system_prompt();
        let temperature = request.temperature;
        let max_tokens = request.max_tokens;

        let mut history: Vec<Message> = request
            .messages
            .into_iter()
            .filter_map(to_rig_message)
            .collect();
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: "request has no user message".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_error(&self.model_name, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        let finish_reason = if max_tokens.is_some_and(|limit| output_tokens >= limit) {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };

        tracing::debug!(
            model = %self.model_name,
            input_tokens,
            output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}
