//! Grounding context assembly.

use crate::rag::types::{AssembledContext, CitedDocument, QuestionCitations};
use crate::retrieval::QuestionResult;
use pigeon_llm::ChatMessage;

/// First line of the grounding message.
pub const CONTEXT_HEADER: &str = "Here is some context to help you answer this email: \n";

/// Build the grounding message and the per-question citation trail.
///
/// Every retrieved document contributes one `question content` line, in
/// question order then rank order. Documents retrieved for several
/// questions appear once per question.
pub fn assemble_context(results: &[QuestionResult]) -> AssembledContext {
    let mut message = String::from(CONTEXT_HEADER);
    let mut citations = Vec::with_capacity(results.len());

    for result in results {
        let mut documents = Vec::with_capacity(result.documents.len());
        for doc in &result.documents {
            message.push_str(&doc.question);
            message.push(' ');
            message.push_str(&doc.content);
            message.push('\n');
            documents.push(CitedDocument {
                doc_ref: doc.doc_ref,
                score: doc.score,
            });
        }
        citations.push(QuestionCitations {
            question: result.question.clone(),
            documents,
        });
    }

    AssembledContext {
        grounding: ChatMessage::system(message),
        citations,
    }
}
