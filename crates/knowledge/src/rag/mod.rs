//! Support-email question answering.
//!
//! Splits an email into questions, retrieves grounding documents for each,
//! drafts a reply and scores how well the corpus covered the questions.

pub mod answer;
pub mod confidence;
pub mod context;
pub mod generate;
pub mod split;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use answer::{Answerer, DEFAULT_TOP_K};
pub use confidence::score_confidence;
pub use context::{assemble_context, CONTEXT_HEADER};
pub use generate::{history_message, ReplyGenerator};
pub use split::{parse_question_list, QuestionSplitter};
pub use types::{
    Answer, AssembledContext, CitedDocument, QuestionCitations, SplitOutcome,
    GENERATION_FAILED_REPLY,
};
