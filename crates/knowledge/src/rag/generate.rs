//! Reply drafting.

use crate::rag::types::GENERATION_FAILED_REPLY;
use pigeon_core::{AppResult, MailSettings};
use pigeon_llm::{ChatMessage, LlmClient, LlmRequest};
use pigeon_prompt::{PromptLibrary, PromptOutputSpec, REPLY_REMINDER_ID, REPLY_SYSTEM_ID};
use std::sync::Arc;

/// Tag a stored thread email as a chat turn.
///
/// Mail sent from the support address is the assistant's side of the
/// conversation; everything else is the participant's.
pub fn history_message(sender: &str, body: &str, mail: &MailSettings) -> ChatMessage {
    if mail.is_support_address(sender) {
        ChatMessage::assistant(body)
    } else {
        ChatMessage::user(body)
    }
}

/// Apply a prompt's sampling settings to `request`.
pub(crate) fn with_sampling(mut request: LlmRequest, output: &PromptOutputSpec) -> LlmRequest {
    if let Some(temperature) = output.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = output.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    request
}

/// Drafts replies with the configured persona.
#[derive(Clone)]
pub struct ReplyGenerator {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: PromptLibrary,
    mail: MailSettings,
}

impl ReplyGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: PromptLibrary,
        mail: MailSettings,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompts,
            mail,
        }
    }

    /// Completion request: persona, thread history, the new email,
    /// grounding, closing reminder. Sampling follows the persona prompt.
    pub fn build_request(
        &self,
        sender: &str,
        email_body: &str,
        history: &[ChatMessage],
        grounding: &ChatMessage,
    ) -> AppResult<LlmRequest> {
        let persona = self.prompts.build(
            REPLY_SYSTEM_ID,
            &[
                ("sender", sender),
                ("organization", self.mail.organization.as_str()),
                ("signoff", self.mail.signoff.as_str()),
            ],
        )?;
        let reminder = self.prompts.render(REPLY_REMINDER_ID, &[])?;

        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(ChatMessage::system(persona.content));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(email_body));
        messages.push(grounding.clone());
        messages.push(ChatMessage::system(reminder));

        Ok(with_sampling(
            LlmRequest::new(&self.model, messages),
            &persona.output,
        ))
    }

    /// Draft a reply in one completion call.
    ///
    /// An empty completion becomes [`GENERATION_FAILED_REPLY`].
    pub async fn generate_reply(
        &self,
        sender: &str,
        email_body: &str,
        history: &[ChatMessage],
        grounding: &ChatMessage,
    ) -> AppResult<String> {
        let request = self.build_request(sender, email_body, history, grounding)?;
        tracing::debug!(
            "Generating reply with {} messages ({} history)",
            request.messages.len(),
            history.len()
        );

        let response = self.llm.complete(&request).await?;

        if response.content.trim().is_empty() {
            tracing::warn!(
                provider = self.llm.provider_name(),
                model = %self.model,
                "Completion returned no content, storing placeholder reply"
            );
            return Ok(GENERATION_FAILED_REPLY.to_string());
        }

        Ok(response.content)
    }
}
