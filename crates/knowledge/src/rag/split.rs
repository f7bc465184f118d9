//! Question splitting.
//!
//! One completion call asks the model to break an email into separate
//! questions as a list literal. Anything that does not parse into a
//! non-empty list of strings falls back to the whole email.

use crate::rag::generate::with_sampling;
use crate::rag::types::SplitOutcome;
use pigeon_core::AppResult;
use pigeon_llm::{ChatMessage, LlmClient, LlmRequest};
use pigeon_prompt::{PromptLibrary, SPLIT_ID};
use serde_json::Value;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

/// Splits an email into questions with a completion model.
#[derive(Clone)]
pub struct QuestionSplitter {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: PromptLibrary,
    organization: String,
}

impl QuestionSplitter {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: PromptLibrary,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompts,
            organization: organization.into(),
        }
    }

    /// Decompose `email_body` into questions.
    ///
    /// Unusable model output yields [`SplitOutcome::Fallback`]; only
    /// provider and prompt errors are returned as `Err`.
    pub async fn split_questions(&self, email_body: &str) -> AppResult<SplitOutcome> {
        let instruction = self
            .prompts
            .build(SPLIT_ID, &[("organization", self.organization.as_str())])?;

        let request = with_sampling(
            LlmRequest::new(
                &self.model,
                vec![
                    ChatMessage::system(instruction.content),
                    ChatMessage::user(email_body),
                ],
            ),
            &instruction.output,
        );

        let response = self.llm.complete(&request).await?;

        match parse_question_list(&response.content) {
            Some(questions) => {
                tracing::info!("Split email into {} questions", questions.len());
                tracing::debug!("Questions: {:?}", questions);
                Ok(SplitOutcome::Parsed(questions))
            }
            None => {
                tracing::warn!(
                    raw_output = %response.content,
                    "Could not parse question list, answering the email as a single question"
                );
                Ok(SplitOutcome::fallback(email_body))
            }
        }
    }
}

/// Parse model output into a non-empty list of non-blank questions.
///
/// Accepts a JSON array of strings or a Python list literal of single- or
/// double-quoted strings, optionally inside a Markdown code fence.
pub fn parse_question_list(raw: &str) -> Option<Vec<String>> {
    let body = strip_code_fence(raw.trim());

    let items = match serde_json::from_str::<Vec<Value>>(body) {
        Ok(values) => values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?,
        Err(_) => parse_list_literal(body)?,
    };

    let questions: Vec<String> = items
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        None
    } else {
        Some(questions)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// `['a', "b", ]` style literal. Non-string elements are rejected.
fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    let mut chars = text.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }

    let mut items = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.next()? {
            ']' => break,
            quote @ ('\'' | '"') => {
                items.push(read_quoted(&mut chars, quote)?);
                skip_whitespace(&mut chars);
                match chars.next()? {
                    ',' => continue,
                    ']' => break,
                    _ => return None,
                }
            }
            _ => return None,
        }
    }

    if chars.any(|c| !c.is_whitespace()) {
        return None;
    }

    Some(items)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut out = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                c @ ('\\' | '\'' | '"') => out.push(c),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}
