//! Question-answering pipeline types.

use pigeon_llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// Reply stored when the completion provider returns no content.
pub const GENERATION_FAILED_REPLY: &str =
    "[pigeon] The model returned an empty reply. Please write this response manually.";

/// How the email was decomposed into questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "questions", rename_all = "camelCase")]
pub enum SplitOutcome {
    /// The model produced a usable question list
    Parsed(Vec<String>),

    /// The model output was unusable; the whole email is the only question
    Fallback(Vec<String>),
}

impl SplitOutcome {
    pub fn fallback(email_body: &str) -> Self {
        SplitOutcome::Fallback(vec![email_body.to_string()])
    }

    pub fn questions(&self) -> &[String] {
        match self {
            SplitOutcome::Parsed(q) | SplitOutcome::Fallback(q) => q,
        }
    }

    pub fn into_questions(self) -> Vec<String> {
        match self {
            SplitOutcome::Parsed(q) | SplitOutcome::Fallback(q) => q,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SplitOutcome::Fallback(_))
    }
}

/// A document cited for one question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedDocument {
    pub doc_ref: i64,
    pub score: f32,
}

/// Documents cited for one question, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCitations {
    pub question: String,
    pub documents: Vec<CitedDocument>,
}

impl QuestionCitations {
    /// Highest score among the cited documents, 0 when there are none.
    pub fn top_score(&self) -> f32 {
        self.documents.iter().map(|d| d.score).fold(0.0, f32::max)
    }
}

/// Grounding message plus the citation trail it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub grounding: ChatMessage,
    pub citations: Vec<QuestionCitations>,
}

/// Result of answering one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub reply: String,
    pub split: SplitOutcome,
    pub citations: Vec<QuestionCitations>,
    pub confidence: f32,
}

impl Answer {
    pub fn questions(&self) -> Vec<&str> {
        self.citations.iter().map(|c| c.question.as_str()).collect()
    }

    /// Number of cited documents per question.
    pub fn docs_per_question(&self) -> Vec<u32> {
        self.citations
            .iter()
            .map(|c| c.documents.len() as u32)
            .collect()
    }

    /// Citations flattened in question order then rank order.
    pub fn flattened(&self) -> Vec<CitedDocument> {
        self.citations
            .iter()
            .flat_map(|c| c.documents.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citations() -> Vec<QuestionCitations> {
        vec![
            QuestionCitations {
                question: "What is HackMIT?".to_string(),
                documents: vec![
                    CitedDocument { doc_ref: 1, score: 0.9 },
                    CitedDocument { doc_ref: 4, score: 0.5 },
                ],
            },
            QuestionCitations {
                question: "When is the deadline?".to_string(),
                documents: vec![],
            },
        ]
    }

    #[test]
    fn test_split_outcome_serialization() {
        let outcome = SplitOutcome::fallback("help");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"outcome":"fallback","questions":["help"]}"#);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.questions(), ["help".to_string()]);
    }

    #[test]
    fn test_answer_flattening() {
        let answer = Answer {
            reply: "hi".to_string(),
            split: SplitOutcome::Parsed(vec![]),
            citations: citations(),
            confidence: 0.0,
        };

        let per_question = answer.docs_per_question();
        let flat = answer.flattened();
        assert_eq!(per_question, vec![2, 0]);
        assert_eq!(flat.len() as u32, per_question.iter().sum::<u32>());
        assert_eq!(flat[1].doc_ref, 4);
        assert_eq!(answer.questions().len(), per_question.len());
    }

    #[test]
    fn test_top_score() {
        let c = citations();
        assert_eq!(c[0].top_score(), 0.9);
        assert_eq!(c[1].top_score(), 0.0);
    }
}
