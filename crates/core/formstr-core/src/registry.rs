//! Question lookup by id
//!
//! Every lookup is total: unknown ids and malformed blobs resolve to defaults.

use crate::question::{Choice, Question, QuestionKind};
use std::collections::HashMap;

/// Id index over a form's questions
#[derive(Debug, Clone)]
pub struct QuestionRegistry<'q> {
    questions: &'q [Question],
    by_id: HashMap<&'q str, &'q Question>,
}

impl<'q> QuestionRegistry<'q> {
    /// Index a question list; the first question wins on duplicate ids
    pub fn new(questions: &'q [Question]) -> Self {
        let mut by_id = HashMap::with_capacity(questions.len());
        for question in questions {
            by_id.entry(question.id()).or_insert(question);
        }
        Self { questions, by_id }
    }

    /// Questions in form order
    pub fn questions(&self) -> &'q [Question] {
        self.questions
    }

    /// Look up a question
    pub fn get(&self, question_id: &str) -> Option<&'q Question> {
        self.by_id.get(question_id).copied()
    }

    /// Whether a question exists
    pub fn contains(&self, question_id: &str) -> bool {
        self.by_id.contains_key(question_id)
    }

    /// Render type, `shortText` when unknown
    pub fn question_kind(&self, question_id: &str) -> QuestionKind {
        self.get(question_id)
            .map(Question::kind)
            .unwrap_or_default()
    }

    /// Ordered choices, empty when unknown
    pub fn choices(&self, question_id: &str) -> &'q [Choice] {
        self.get(question_id).map(Question::choices).unwrap_or(&[])
    }

    /// Display label, empty when unknown
    pub fn label(&self, question_id: &str) -> &'q str {
        self.get(question_id).map(Question::label).unwrap_or("")
    }
}
