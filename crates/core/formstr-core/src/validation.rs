//! Builder-side validation of condition trees
//!
//! The filler's evaluator tolerates anything; these checks are for the form
//! builder before a form is published.

use crate::conditions::ConditionGroup;
use crate::config::VisibilityConfig;
use crate::evaluator::{parse_number, supported_operators};
use crate::question::{Question, QuestionKind};
use crate::registry::QuestionRegistry;
use crate::{ConditionsError, Result};
use std::collections::HashMap;

/// Condition tree validator
#[derive(Debug, Clone)]
pub struct ConditionValidator {
    /// Maximum tree depth
    max_depth: usize,
}

impl Default for ConditionValidator {
    fn default() -> Self {
        Self::with_config(&VisibilityConfig::default())
    }
}

impl ConditionValidator {
    /// Create new validator with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create validator sharing the evaluator's limits
    pub fn with_config(config: &VisibilityConfig) -> Self {
        Self {
            max_depth: config.max_depth,
        }
    }

    /// Validate one question's tree against the form's questions
    pub fn validate(&self, owner_id: &str, group: &ConditionGroup, questions: &[Question]) -> Result<()> {
        let depth = group.depth();
        if depth > self.max_depth {
            return Err(ConditionsError::DepthExceeded {
                depth,
                limit: self.max_depth,
            });
        }

        let registry = QuestionRegistry::new(questions);
        for rule in group.iter_rules() {
            if rule.question_id.is_empty() {
                return Err(ConditionsError::validation(format!(
                    "Question '{}' has a rule with no question selected",
                    owner_id
                )));
            }

            if rule.question_id == owner_id {
                return Err(ConditionsError::SelfReference(owner_id.to_string()));
            }

            let dependency = registry
                .get(&rule.question_id)
                .ok_or_else(|| ConditionsError::QuestionNotFound(rule.question_id.clone()))?;
            let kind = dependency.kind();

            if !supported_operators(kind).contains(&rule.operator) {
                return Err(ConditionsError::UnsupportedOperator {
                    question_id: rule.question_id.clone(),
                    kind: kind.to_string(),
                    operator: rule.operator.to_string(),
                });
            }

            if rule.value.is_empty() {
                return Err(ConditionsError::validation(format!(
                    "Rule on '{}' has no value",
                    rule.question_id
                )));
            }

            if kind.has_choices() && !dependency.choices().is_empty() {
                for value in rule.value.as_list() {
                    if dependency.choice_label(value).is_none() {
                        return Err(ConditionsError::validation(format!(
                            "'{}' is not a choice of question '{}'",
                            value, rule.question_id
                        )));
                    }
                }
            }

            if kind == QuestionKind::Number && parse_number(&rule.value.to_text()).is_none() {
                return Err(ConditionsError::not_numeric(
                    rule.question_id.clone(),
                    rule.value.to_text(),
                ));
            }
        }

        Ok(())
    }

    /// Validate a question's stored conditions
    pub fn validate_question(&self, question: &Question, questions: &[Question]) -> Result<()> {
        match question.conditions()? {
            Some(group) => self.validate(question.id(), group, questions),
            None => Ok(()),
        }
    }

    /// Validate every question and reject circular dependencies
    pub fn validate_form(&self, questions: &[Question]) -> Result<()> {
        for question in questions {
            self.validate_question(question, questions)?;
        }
        check_cycles(questions)
    }
}

fn check_cycles(questions: &[Question]) -> Result<()> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for question in questions {
        let deps = match question.conditions() {
            Ok(Some(group)) => group.dependencies().into_iter().collect(),
            _ => Vec::new(),
        };
        graph.insert(question.id(), deps);
    }

    let mut visited: HashMap<&str, bool> = HashMap::new();
    let mut in_progress: HashMap<&str, bool> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashMap<&'a str, bool>,
        in_progress: &mut HashMap<&'a str, bool>,
    ) -> Result<()> {
        if *in_progress.get(node).unwrap_or(&false) {
            return Err(ConditionsError::CyclicDependency(node.to_string()));
        }
        if *visited.get(node).unwrap_or(&false) {
            return Ok(());
        }

        in_progress.insert(node, true);
        if let Some(deps) = graph.get(node) {
            for dep in deps {
                visit(dep, graph, visited, in_progress)?;
            }
        }
        in_progress.insert(node, false);
        visited.insert(node, true);
        Ok(())
    }

    for question in questions {
        visit(question.id(), &graph, &mut visited, &mut in_progress)?;
    }
    Ok(())
}
