/*!
# Condition Evaluation

Evaluates condition trees against a respondent's answers.

- Comparison semantics are chosen by the dependency question's render type
- A rule on an unanswered or unknown question never holds, for any operator
- Groups fold left to right, each step using the previous element's
  `nextLogic`; there is no operator precedence beyond explicit nesting

The `check_*` methods report why a rule did not hold. The `evaluate_*` methods
are total and never fail.
*/

use crate::answers::{Answer, AnswerMap};
use crate::conditions::{ConditionGroup, ConditionNode, ConditionRule, Operator, RuleValue};
use crate::config::VisibilityConfig;
use crate::question::{Question, QuestionKind};
use crate::registry::QuestionRegistry;
use crate::{ConditionsError, Result};
use std::collections::HashSet;

const CHOICE_OPERATORS: &[Operator] = &[Operator::Equals, Operator::NotEquals];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::LessThan,
    Operator::GreaterThanEqual,
    Operator::LessThanEqual,
];

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::StartsWith,
    Operator::EndsWith,
];

/// Operators offered for a render type
///
/// Anything else falls back to `equals` during evaluation.
pub fn supported_operators(kind: QuestionKind) -> &'static [Operator] {
    match kind {
        QuestionKind::RadioButton
        | QuestionKind::Dropdown
        | QuestionKind::Checkboxes
        | QuestionKind::Date
        | QuestionKind::Time => CHOICE_OPERATORS,
        QuestionKind::Number => NUMBER_OPERATORS,
        QuestionKind::ShortText | QuestionKind::Paragraph => TEXT_OPERATORS,
    }
}

/// Parse a number; blank and non-finite input is not a number
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn negate_if(operator: Operator, matched: bool) -> bool {
    if operator == Operator::NotEquals {
        !matched
    } else {
        matched
    }
}

/// Evaluator bound to one form's questions
#[derive(Debug, Clone)]
pub struct Evaluator<'q> {
    registry: QuestionRegistry<'q>,
    config: VisibilityConfig,
}

impl<'q> Evaluator<'q> {
    /// Create an evaluator with default configuration
    pub fn new(questions: &'q [Question]) -> Self {
        Self::with_config(questions, VisibilityConfig::default())
    }

    /// Create an evaluator with explicit configuration
    pub fn with_config(questions: &'q [Question], config: VisibilityConfig) -> Self {
        Self {
            registry: QuestionRegistry::new(questions),
            config,
        }
    }

    /// Question lookup used for dependencies
    pub fn registry(&self) -> &QuestionRegistry<'q> {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    /// Whether a rule holds; any anomaly reads as `false`
    pub fn evaluate_rule(&self, rule: &ConditionRule, answers: &AnswerMap) -> bool {
        match self.check_rule(rule, answers) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Rule on {} does not hold: {}", rule.question_id, e);
                false
            }
        }
    }

    /// Whether a rule holds, with the reason when it cannot
    pub fn check_rule(&self, rule: &ConditionRule, answers: &AnswerMap) -> Result<bool> {
        let answer = answers
            .get(&rule.question_id)
            .ok_or_else(|| ConditionsError::Unanswered(rule.question_id.clone()))?;

        let question = self
            .registry
            .get(&rule.question_id)
            .ok_or_else(|| ConditionsError::QuestionNotFound(rule.question_id.clone()))?;

        let kind = question.kind();
        let result = compare(kind, rule, answer)?;
        tracing::debug!(
            "Rule {} {} {:?} on {} answer {:?} -> {}",
            rule.question_id,
            rule.operator.symbol(),
            rule.value,
            kind,
            answer,
            result
        );
        Ok(result)
    }

    /// Whether a group holds
    ///
    /// An empty group holds. A tree deeper than the configured limit resolves
    /// to the error policy's fallback.
    pub fn evaluate_group(&self, group: &ConditionGroup, answers: &AnswerMap) -> bool {
        match self.check_group(group, answers) {
            Ok(result) => result,
            Err(e) => {
                let fallback = self.config.error_policy.fallback();
                tracing::warn!("Condition group failed ({}), using {}", e, fallback);
                fallback
            }
        }
    }

    /// Whether a group holds, failing only on structural problems
    pub fn check_group(&self, group: &ConditionGroup, answers: &AnswerMap) -> Result<bool> {
        self.check_group_at(group, answers, 1)
    }

    fn check_group_at(&self, group: &ConditionGroup, answers: &AnswerMap, depth: usize) -> Result<bool> {
        if depth > self.config.max_depth {
            return Err(ConditionsError::DepthExceeded {
                depth,
                limit: self.config.max_depth,
            });
        }

        let mut nodes = group.rules.iter();
        let Some(first) = nodes.next() else {
            return Ok(true);
        };

        let mut result = self.check_node(first, answers, depth)?;
        let mut logic = first.next_logic();
        for node in nodes {
            let current = self.check_node(node, answers, depth)?;
            result = logic.combine(result, current);
            logic = node.next_logic();
        }

        Ok(result)
    }

    fn check_node(&self, node: &ConditionNode, answers: &AnswerMap, depth: usize) -> Result<bool> {
        match node {
            ConditionNode::Rule(rule) => match self.check_rule(rule, answers) {
                Err(e) if e.is_rule_miss() => {
                    tracing::debug!("Rule on {} does not hold: {}", rule.question_id, e);
                    Ok(false)
                }
                other => other,
            },
            ConditionNode::Group(group) => self.check_group_at(group, answers, depth + 1),
        }
    }
}

fn compare(kind: QuestionKind, rule: &ConditionRule, answer: &Answer) -> Result<bool> {
    let operator = rule.operator;
    match kind {
        QuestionKind::Checkboxes => {
            let selected: HashSet<&str> = answer.as_list().into_iter().collect();
            let all_selected = rule.value.as_list().iter().all(|v| selected.contains(v));
            Ok(negate_if(operator, all_selected))
        }
        QuestionKind::RadioButton
        | QuestionKind::Dropdown
        | QuestionKind::Date
        | QuestionKind::Time => Ok(negate_if(operator, answer.to_text() == rule.value.to_text())),
        QuestionKind::Number => compare_numbers(rule, answer),
        QuestionKind::ShortText | QuestionKind::Paragraph => Ok(compare_text(operator, answer, &rule.value)),
    }
}

fn compare_numbers(rule: &ConditionRule, answer: &Answer) -> Result<bool> {
    let answer_text = answer.to_text();
    let lhs = parse_number(&answer_text)
        .ok_or_else(|| ConditionsError::not_numeric(rule.question_id.clone(), answer_text))?;
    let value_text = rule.value.to_text();
    let rhs = parse_number(&value_text)
        .ok_or_else(|| ConditionsError::not_numeric(rule.question_id.clone(), value_text))?;

    Ok(match rule.operator {
        Operator::NotEquals => lhs != rhs,
        Operator::GreaterThan => lhs > rhs,
        Operator::LessThan => lhs < rhs,
        Operator::GreaterThanEqual => lhs >= rhs,
        Operator::LessThanEqual => lhs <= rhs,
        _ => lhs == rhs,
    })
}

fn compare_text(operator: Operator, answer: &Answer, value: &RuleValue) -> bool {
    let answer = answer.to_text();
    let value = value.to_text();
    match operator {
        Operator::NotEquals => answer != value,
        Operator::Contains => answer.to_lowercase().contains(&value.to_lowercase()),
        Operator::StartsWith => answer.to_lowercase().starts_with(&value.to_lowercase()),
        Operator::EndsWith => answer.to_lowercase().ends_with(&value.to_lowercase()),
        _ => answer == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::LogicOp;
    use crate::question::Choice;

    fn form() -> Vec<Question> {
        vec![
            Question::new("name", "Name"),
            Question::new("attend", "Can you attend?")
                .with_kind(QuestionKind::RadioButton)
                .with_choices(vec![Choice::new("yes", "Yes"), Choice::new("no", "No")]),
            Question::new("heard", "How did you hear?")
                .with_kind(QuestionKind::Checkboxes)
                .with_choices(vec![
                    Choice::new("a", "Website"),
                    Choice::new("b", "Friend"),
                    Choice::new("c", "Newsletter"),
                ]),
            Question::new("guests", "Guests").with_kind(QuestionKind::Number),
            Question::new("day", "Day").with_kind(QuestionKind::Date),
            Question::new("broken", "Broken").with_settings_json("not json"),
        ]
    }

    fn rule(question_id: &str, operator: Operator, value: impl Into<RuleValue>) -> ConditionRule {
        ConditionRule::new(question_id, value).with_operator(operator)
    }

    #[test]
    fn test_unanswered_never_holds() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new();

        for op in Operator::ALL {
            assert!(!evaluator.evaluate_rule(&rule("name", op, "x"), &answers));
        }
        assert!(matches!(
            evaluator.check_rule(&rule("name", Operator::NotEquals, "x"), &answers),
            Err(ConditionsError::Unanswered(_))
        ));

        let answers = AnswerMap::new().with("heard", Vec::<String>::new());
        assert!(!evaluator.evaluate_rule(&rule("heard", Operator::NotEquals, vec!["a"]), &answers));
    }

    #[test]
    fn test_unknown_question_never_holds() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("ghost", "x");

        assert!(matches!(
            evaluator.check_rule(&rule("ghost", Operator::Equals, "x"), &answers),
            Err(ConditionsError::QuestionNotFound(_))
        ));
        assert!(!evaluator.evaluate_rule(&rule("ghost", Operator::NotEquals, "y"), &answers));
    }

    #[test]
    fn test_checkbox_subset() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let equals = rule("heard", Operator::Equals, vec!["a", "b"]);
        let not_equals = rule("heard", Operator::NotEquals, vec!["a", "b"]);

        let answers = AnswerMap::new().with("heard", vec!["a", "b", "c"]);
        assert!(evaluator.evaluate_rule(&equals, &answers));
        assert!(!evaluator.evaluate_rule(&not_equals, &answers));

        let answers = AnswerMap::new().with("heard", vec!["a"]);
        assert!(!evaluator.evaluate_rule(&equals, &answers));
        assert!(evaluator.evaluate_rule(&not_equals, &answers));

        // a single stored value still reads as a one-element selection
        let answers = AnswerMap::new().with("heard", "b");
        assert!(evaluator.evaluate_rule(&rule("heard", Operator::Equals, "b"), &answers));
    }

    #[test]
    fn test_single_choice() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("attend", "yes");

        assert!(evaluator.evaluate_rule(&rule("attend", Operator::Equals, "yes"), &answers));
        assert!(!evaluator.evaluate_rule(&rule("attend", Operator::NotEquals, "yes"), &answers));
        assert!(evaluator.evaluate_rule(&rule("attend", Operator::NotEquals, "no"), &answers));
        // unsupported operator behaves as equals
        assert!(!evaluator.evaluate_rule(&rule("attend", Operator::Contains, "ye"), &answers));
    }

    #[test]
    fn test_number_operators() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let gte = rule("guests", Operator::GreaterThanEqual, "10");

        assert!(evaluator.evaluate_rule(&gte, &AnswerMap::new().with("guests", "10")));
        assert!(!evaluator.evaluate_rule(&gte, &AnswerMap::new().with("guests", "9")));
        assert!(!evaluator.evaluate_rule(&gte, &AnswerMap::new().with("guests", "abc")));

        let answers = AnswerMap::new().with("guests", " 2.5 ");
        assert!(evaluator.evaluate_rule(&rule("guests", Operator::LessThan, "3"), &answers));
        assert!(evaluator.evaluate_rule(&rule("guests", Operator::GreaterThan, "2"), &answers));
        assert!(evaluator.evaluate_rule(&rule("guests", Operator::LessThanEqual, "2.5"), &answers));
        assert!(evaluator.evaluate_rule(&rule("guests", Operator::NotEquals, "2"), &answers));
        assert!(evaluator.evaluate_rule(&rule("guests", Operator::Equals, "2.50"), &answers));
        // contains is not a number operator and falls back to equals
        assert!(!evaluator.evaluate_rule(&rule("guests", Operator::Contains, "2"), &answers));

        assert!(matches!(
            evaluator.check_rule(&rule("guests", Operator::Equals, ""), &answers),
            Err(ConditionsError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_overflowing_numbers_are_not_numeric() {
        assert_eq!(parse_number("1e400"), None);
        assert_eq!(parse_number("-1e400"), None);
        assert_eq!(parse_number("1e300"), Some(1e300));

        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("guests", "1e400");
        assert!(!evaluator.evaluate_rule(&rule("guests", Operator::GreaterThan, "5"), &answers));
    }

    #[test]
    fn test_date_is_verbatim() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("day", "2024-05-01");

        assert!(evaluator.evaluate_rule(&rule("day", Operator::Equals, "2024-05-01"), &answers));
        assert!(!evaluator.evaluate_rule(&rule("day", Operator::Equals, "2024-5-1"), &answers));
        assert!(evaluator.evaluate_rule(&rule("day", Operator::NotEquals, "2024-5-1"), &answers));
    }

    #[test]
    fn test_text_operators() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("name", "xFOOy");

        assert!(evaluator.evaluate_rule(&rule("name", Operator::Contains, "Foo"), &answers));
        assert!(evaluator.evaluate_rule(&rule("name", Operator::StartsWith, "XF"), &answers));
        assert!(evaluator.evaluate_rule(&rule("name", Operator::EndsWith, "OY"), &answers));
        assert!(!evaluator.evaluate_rule(&rule("name", Operator::Equals, "xfooy"), &answers));
        assert!(evaluator.evaluate_rule(&rule("name", Operator::NotEquals, "xfooy"), &answers));
        assert!(!evaluator.evaluate_rule(&rule("name", Operator::GreaterThan, "a"), &answers));
    }

    #[test]
    fn test_malformed_dependency_is_free_text() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let answers = AnswerMap::new().with("broken", "Hello");
        assert!(evaluator.evaluate_rule(&rule("broken", Operator::Contains, "ell"), &answers));
    }

    #[test]
    fn test_group_fold_is_left_to_right() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        // (false AND false) OR true == true, whereas false AND (false OR true) == false
        let group = ConditionGroup::new()
            .with_rule(rule("name", Operator::Equals, "nope").with_next_logic(LogicOp::And))
            .with_rule(rule("attend", Operator::Equals, "no").with_next_logic(LogicOp::Or))
            .with_rule(rule("guests", Operator::Equals, "3"));
        let answers = AnswerMap::new()
            .with("name", "Ann")
            .with("attend", "yes")
            .with("guests", "3");

        assert!(evaluator.evaluate_group(&group, &answers));
    }

    #[test]
    fn test_last_next_logic_is_ignored() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        let group = ConditionGroup::new()
            .with_rule(rule("name", Operator::Equals, "Ann").with_next_logic(LogicOp::Or));
        assert!(!evaluator.evaluate_group(&group, &AnswerMap::new()));
        assert!(evaluator.evaluate_group(&group, &AnswerMap::new().with("name", "Ann")));
    }

    #[test]
    fn test_empty_group_holds() {
        let questions = form();
        let evaluator = Evaluator::new(&questions);
        assert!(evaluator.evaluate_group(&ConditionGroup::new(), &AnswerMap::new()));
    }

    #[test]
    fn test_depth_limit_uses_policy() {
        let questions = form();
        let mut group = ConditionGroup::new().with_rule(rule("name", Operator::Equals, "Ann"));
        for _ in 0..4 {
            group = ConditionGroup::new().with_group(group);
        }
        let answers = AnswerMap::new();

        let open = Evaluator::with_config(&questions, VisibilityConfig::default().with_max_depth(3));
        assert!(matches!(
            open.check_group(&group, &answers),
            Err(ConditionsError::DepthExceeded { .. })
        ));
        assert!(open.evaluate_group(&group, &answers));

        let closed = Evaluator::with_config(
            &questions,
            VisibilityConfig::default()
                .with_max_depth(3)
                .with_error_policy(crate::config::ErrorPolicy::HideQuestion),
        );
        assert!(!closed.evaluate_group(&group, &answers));
    }

    #[test]
    fn test_supported_operators() {
        assert_eq!(supported_operators(QuestionKind::Number).len(), 6);
        assert!(supported_operators(QuestionKind::Paragraph).contains(&Operator::Contains));
        assert!(!supported_operators(QuestionKind::Dropdown).contains(&Operator::Contains));
        assert_eq!(supported_operators(QuestionKind::Time), CHOICE_OPERATORS);
    }
}
