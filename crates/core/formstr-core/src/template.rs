//! Construction of new questions with generated ids

use crate::conditions::ConditionGroup;
use crate::ids::IdGenerator;
use crate::question::{Choice, Question, QuestionKind};

/// Prefix of generated field ids
pub const FIELD_PREFIX: &str = "field";

/// Prefix of generated choice ids
pub const OPTION_PREFIX: &str = "option";

/// Builds questions for templates and the form builder
pub struct FieldBuilder<'g> {
    ids: &'g dyn IdGenerator,
}

impl<'g> FieldBuilder<'g> {
    /// Create a builder drawing ids from `ids`
    pub fn new(ids: &'g dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// New question of the given render type
    pub fn field(&self, label: impl Into<String>, kind: QuestionKind) -> Question {
        Question::new(self.ids.next_id(FIELD_PREFIX), label)
            .with_data_kind(kind.data_kind())
            .with_kind(kind)
    }

    /// New choice question; every label gets a generated choice id
    pub fn choice_field(&self, label: impl Into<String>, kind: QuestionKind, labels: &[&str]) -> Question {
        let question = self.field(label, kind);
        let choices = self.choices(labels);
        question.with_choices(choices)
    }

    /// Choices with generated ids
    pub fn choices(&self, labels: &[&str]) -> Vec<Choice> {
        labels
            .iter()
            .map(|label| Choice::new(self.ids.next_id(OPTION_PREFIX), *label))
            .collect()
    }

    /// New question shown only when `conditions` hold
    pub fn conditional_field(
        &self,
        label: impl Into<String>,
        kind: QuestionKind,
        conditions: ConditionGroup,
    ) -> Question {
        self.field(label, kind).with_conditions(conditions)
    }
}

impl std::fmt::Debug for FieldBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBuilder").finish_non_exhaustive()
    }
}
