//! Loading of condition trees, including the older stored shapes
//!
//! Accepted shapes, all upgraded to the canonical tree:
//! - canonical nodes carrying a `kind` discriminant
//! - untagged nodes (a `rules` array marks a group, a `questionId` marks a rule)
//! - `{ rules: [...] }` flat lists, combined with AND
//! - `{ rules: [...], logicType: "AND" | "OR" }`, one combinator for every child
//! - a bare array of rules, combined with AND

use super::{ConditionGroup, ConditionNode, ConditionRule, LogicOp, Operator, RuleValue};
use crate::{ConditionsError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    question_id: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    next_logic: Option<String>,
    #[serde(default)]
    rules: Option<Vec<Value>>,
    #[serde(default)]
    logic_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Rule,
    Group,
}

impl RawNode {
    fn shape(&self) -> Result<Shape> {
        match self.kind.as_deref() {
            Some("rule") => Ok(Shape::Rule),
            Some("group") => Ok(Shape::Group),
            Some(other) => Err(ConditionsError::malformed_condition(format!(
                "unknown node kind '{}'",
                other
            ))),
            None if self.rules.is_some() => Ok(Shape::Group),
            None if self.question_id.is_some() => Ok(Shape::Rule),
            None => Err(ConditionsError::malformed_condition(
                "node has neither 'rules' nor 'questionId'",
            )),
        }
    }

    fn next_logic(&self) -> Option<LogicOp> {
        self.next_logic.as_deref().map(parse_logic)
    }
}

fn parse_logic(raw: &str) -> LogicOp {
    LogicOp::parse(raw).unwrap_or_else(|| {
        tracing::debug!("Unknown logic '{}', using AND", raw);
        LogicOp::And
    })
}

fn parse_raw(value: &Value) -> Result<RawNode> {
    if !value.is_object() {
        return Err(ConditionsError::malformed_condition(format!(
            "expected an object, found {}",
            value
        )));
    }
    Ok(RawNode::deserialize(value)?)
}

/// Load the `conditions` entry of a question's settings
///
/// Returns `None` when no conditions are stored. A lone rule object is
/// accepted and wrapped in a one-element group.
pub fn normalize_conditions(value: &Value) -> Result<Option<ConditionGroup>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(group_from_items(items, None, None)?)),
        Value::Object(_) => {
            let raw = parse_raw(value)?;
            match raw.shape()? {
                Shape::Group => Ok(Some(group_from_raw(raw)?)),
                Shape::Rule => {
                    tracing::debug!("Wrapping single condition rule in a group");
                    let rule = rule_from_raw(raw, None)?;
                    Ok(Some(ConditionGroup {
                        rules: vec![ConditionNode::Rule(rule)],
                        next_logic: LogicOp::And,
                    }))
                }
            }
        }
        other => Err(ConditionsError::malformed_condition(format!(
            "conditions must be an object or an array, found {}",
            other
        ))),
    }
}

/// Load a single node of a tree
pub fn node_from_value(value: &Value) -> Result<ConditionNode> {
    node_with_inherited_logic(value, None)
}

fn node_with_inherited_logic(value: &Value, inherited: Option<LogicOp>) -> Result<ConditionNode> {
    let raw = parse_raw(value)?;
    match raw.shape()? {
        Shape::Rule => Ok(ConditionNode::Rule(rule_from_raw(raw, inherited)?)),
        Shape::Group => {
            let explicit = raw.next_logic();
            let mut group = group_from_raw(raw)?;
            group.next_logic = explicit.or(inherited).unwrap_or_default();
            Ok(ConditionNode::Group(group))
        }
    }
}

fn group_from_raw(raw: RawNode) -> Result<ConditionGroup> {
    let logic_type = raw.logic_type.as_deref().map(parse_logic);
    if logic_type.is_some() {
        tracing::debug!("Upgrading legacy condition group with top-level logicType");
    }
    let next_logic = raw.next_logic();
    let items = raw.rules.unwrap_or_default();
    group_from_items(&items, logic_type, next_logic)
}

fn group_from_items(
    items: &[Value],
    logic_type: Option<LogicOp>,
    next_logic: Option<LogicOp>,
) -> Result<ConditionGroup> {
    let rules = items
        .iter()
        .map(|item| node_with_inherited_logic(item, logic_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ConditionGroup {
        rules,
        next_logic: next_logic.unwrap_or_default(),
    })
}

fn rule_from_raw(raw: RawNode, inherited: Option<LogicOp>) -> Result<ConditionRule> {
    let next_logic = raw.next_logic().or(inherited).unwrap_or_default();
    let question_id = raw.question_id.ok_or_else(|| {
        ConditionsError::malformed_condition("condition rule is missing 'questionId'")
    })?;
    let value = match raw.value {
        Some(ref value) => RuleValue::from_json(value)?,
        None => RuleValue::default(),
    };
    let operator = raw
        .operator
        .as_deref()
        .map(Operator::parse_lenient)
        .unwrap_or_default();

    Ok(ConditionRule {
        question_id,
        value,
        operator,
        next_logic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_at(group: &ConditionGroup, idx: usize) -> &ConditionRule {
        match &group.rules[idx] {
            ConditionNode::Rule(rule) => rule,
            ConditionNode::Group(_) => panic!("Expected rule at {}", idx),
        }
    }

    #[test]
    fn test_flat_legacy_list_defaults_to_and() {
        let group = normalize_conditions(&json!({
            "rules": [
                {"questionId": "q1", "value": "yes"},
                {"questionId": "q2", "value": "no", "operator": "notEquals"}
            ]
        }))
        .unwrap()
        .unwrap();

        assert_eq!(group.rules.len(), 2);
        assert_eq!(rule_at(&group, 0).next_logic, LogicOp::And);
        assert_eq!(rule_at(&group, 0).operator, Operator::Equals);
        assert_eq!(rule_at(&group, 1).operator, Operator::NotEquals);
    }

    #[test]
    fn test_logic_type_is_pushed_onto_children() {
        let group = normalize_conditions(&json!({
            "logicType": "OR",
            "rules": [
                {"questionId": "q1", "value": "a"},
                {"questionId": "q2", "value": "b", "nextLogic": "AND"},
                {"questionId": "q3", "value": "c"}
            ]
        }))
        .unwrap()
        .unwrap();

        assert_eq!(rule_at(&group, 0).next_logic, LogicOp::Or);
        // explicit nextLogic wins over the legacy combinator
        assert_eq!(rule_at(&group, 1).next_logic, LogicOp::And);
        assert_eq!(rule_at(&group, 2).next_logic, LogicOp::Or);
    }

    #[test]
    fn test_bare_array_and_single_rule() {
        let group = normalize_conditions(&json!([{"questionId": "q1", "value": "x"}]))
            .unwrap()
            .unwrap();
        assert_eq!(group.rules.len(), 1);

        let group = normalize_conditions(&json!({"questionId": "q1", "value": "x"}))
            .unwrap()
            .unwrap();
        assert_eq!(rule_at(&group, 0).question_id, "q1");
    }

    #[test]
    fn test_kind_is_authoritative() {
        // a group that happens to carry a questionId key stays a group
        let node = node_from_value(&json!({
            "kind": "group",
            "questionId": "stray",
            "rules": [{"kind": "rule", "questionId": "q1", "value": "a"}]
        }))
        .unwrap();
        assert!(matches!(node, ConditionNode::Group(_)));

        assert!(node_from_value(&json!({"kind": "branch"})).is_err());
    }

    #[test]
    fn test_untagged_group_wins_over_question_id() {
        let node = node_from_value(&json!({
            "questionId": "stray",
            "rules": []
        }))
        .unwrap();
        assert!(matches!(node, ConditionNode::Group(_)));
    }

    #[test]
    fn test_malformed_shapes() {
        assert!(normalize_conditions(&json!("yes")).is_err());
        assert!(normalize_conditions(&json!({"value": "x"})).is_err());
        assert!(normalize_conditions(&json!({"rules": [42]})).is_err());
        assert!(normalize_conditions(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_numeric_value_and_unknown_operator() {
        let node = node_from_value(&json!({
            "questionId": "age",
            "value": 18,
            "operator": "between"
        }))
        .unwrap();
        match node {
            ConditionNode::Rule(rule) => {
                assert_eq!(rule.value, RuleValue::Single("18".to_string()));
                assert_eq!(rule.operator, Operator::Equals);
            }
            ConditionNode::Group(_) => panic!("Expected rule"),
        }
    }
}
