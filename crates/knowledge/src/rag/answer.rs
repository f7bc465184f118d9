//! Question-answering orchestration.
//!
//! email → split → retrieve → assemble context → generate → confidence.

use crate::rag::confidence::score_confidence;
use crate::rag::context::assemble_context;
use crate::rag::generate::ReplyGenerator;
use crate::rag::split::QuestionSplitter;
use crate::rag::types::Answer;
use crate::retrieval::Retriever;
use pigeon_core::{AppError, AppResult, MailSettings};
use pigeon_llm::{ChatMessage, LlmClient};
use pigeon_prompt::PromptLibrary;
use std::sync::Arc;
use std::time::Duration;

/// Documents retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Answers support emails against the indexed corpus.
pub struct Answerer {
    splitter: QuestionSplitter,
    retriever: Retriever,
    generator: ReplyGenerator,
    top_k: usize,
    deadline: Option<Duration>,
}

impl Answerer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        retriever: Retriever,
        prompts: PromptLibrary,
        mail: MailSettings,
    ) -> Self {
        let model = model.into();
        Self {
            splitter: QuestionSplitter::new(
                Arc::clone(&llm),
                model.clone(),
                prompts.clone(),
                mail.organization.clone(),
            ),
            generator: ReplyGenerator::new(llm, model, prompts, mail),
            retriever,
            top_k: DEFAULT_TOP_K,
            deadline: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Bound the whole pipeline; exceeding it is [`AppError::Timeout`].
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Draft a reply to `email_body` given the earlier thread messages.
    ///
    /// Model-quality problems are absorbed (split fallback, placeholder
    /// reply). Provider, index and deadline failures are returned.
    pub async fn answer_email(
        &self,
        sender: &str,
        email_body: &str,
        history: &[ChatMessage],
    ) -> AppResult<Answer> {
        match self.deadline {
            Some(limit) => tokio::time::timeout(limit, self.run(sender, email_body, history))
                .await
                .map_err(|_| {
                    AppError::Timeout(format!(
                        "answering email exceeded {:.1}s deadline",
                        limit.as_secs_f64()
                    ))
                })?,
            None => self.run(sender, email_body, history).await,
        }
    }

    #[tracing::instrument(skip_all, fields(sender = %sender, history = history.len()))]
    async fn run(
        &self,
        sender: &str,
        email_body: &str,
        history: &[ChatMessage],
    ) -> AppResult<Answer> {
        let split = self.splitter.split_questions(email_body).await?;

        let results = self.retriever.retrieve(split.questions(), self.top_k).await?;
        let context = assemble_context(&results);

        let reply = self
            .generator
            .generate_reply(sender, email_body, history, &context.grounding)
            .await?;

        let top_scores: Vec<f32> = context.citations.iter().map(|c| c.top_score()).collect();
        let confidence = score_confidence(&top_scores);

        tracing::info!(
            "Answered email: {} questions, {} citations, confidence {:.2}{}",
            context.citations.len(),
            context.citations.iter().map(|c| c.documents.len()).sum::<usize>(),
            confidence,
            if split.is_fallback() { " (split fallback)" } else { "" }
        );

        Ok(Answer {
            reply,
            split,
            citations: context.citations,
            confidence,
        })
    }
}
