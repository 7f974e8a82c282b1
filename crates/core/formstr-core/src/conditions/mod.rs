/*!
# Condition Trees

Data model for question visibility conditions:

- **Rules** compare one dependency question's answer with a literal value
- **Groups** hold an ordered sequence of rules and nested groups
- Elements of a group are combined strictly left to right, each one using the
  `nextLogic` of the element before it

Trees travel as JSON inside a question's settings blob. Loading goes through
[`legacy`], which upgrades older shapes into the canonical tree once.
*/

pub mod legacy;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// How an element combines with the element after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "&'static str")]
pub enum LogicOp {
    /// Both sides must hold
    #[default]
    And,
    /// Either side may hold
    Or,
}

impl LogicOp {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Parse a wire name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    /// Combine a running result with the next element's result
    pub fn combine(&self, running: bool, next: bool) -> bool {
        match self {
            Self::And => running && next,
            Self::Or => running || next,
        }
    }
}

impl From<LogicOp> for &'static str {
    fn from(op: LogicOp) -> Self {
        op.as_str()
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogicOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_default())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "&'static str")]
pub enum Operator {
    /// Equal (subset for multi-select)
    #[default]
    Equals,
    /// Not equal
    NotEquals,
    /// Case-insensitive substring
    Contains,
    /// Case-insensitive prefix
    StartsWith,
    /// Case-insensitive suffix
    EndsWith,
    /// Greater than
    GreaterThan,
    /// Less than
    LessThan,
    /// Greater than or equal
    GreaterThanEqual,
    /// Less than or equal
    LessThanEqual,
}

impl Operator {
    /// Every operator, in builder display order
    pub const ALL: [Operator; 9] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanEqual,
        Self::LessThanEqual,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::GreaterThanEqual => "greaterThanEqual",
            Self::LessThanEqual => "lessThanEqual",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == s)
    }

    /// Parse a wire name, falling back to `equals` for anything unknown
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::debug!("Unknown operator '{}', using equals", s);
            Self::Equals
        })
    }

    /// Short symbol used when describing rules
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "≠",
            Self::Contains => "contains",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanEqual => "≥",
            Self::LessThanEqual => "≤",
        }
    }
}

impl From<Operator> for &'static str {
    fn from(op: Operator) -> Self {
        op.as_str()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Literal side of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// One value
    Single(String),
    /// Several values (multi-select comparisons)
    Multiple(Vec<String>),
}

impl Default for RuleValue {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl RuleValue {
    /// Build from JSON, stringifying scalars the builder may have stored
    pub fn from_json(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(items) => Ok(Self::Multiple(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            Value::Object(_) => Err(crate::ConditionsError::malformed_condition(
                "rule value must be a string or a list of strings",
            )),
            scalar => Ok(Self::Single(scalar_to_string(scalar).unwrap_or_default())),
        }
    }

    /// Values as a list (a single value is a one-element list)
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Values joined with commas
    pub fn to_text(&self) -> String {
        match self {
            Self::Single(s) => s.clone(),
            Self::Multiple(values) => values.join(","),
        }
    }

    /// Whether no value has been set
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(s) => s.is_empty(),
            Self::Multiple(values) => values.is_empty(),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for RuleValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

impl From<Vec<&str>> for RuleValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(String::from).collect())
    }
}

impl<'de> Deserialize<'de> for RuleValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Leaf comparison against another question's answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename = "rule", rename_all = "camelCase")]
pub struct ConditionRule {
    /// Dependency question
    pub question_id: String,
    /// Literal to compare with
    pub value: RuleValue,
    /// Comparison
    pub operator: Operator,
    /// Combinator with the next sibling
    pub next_logic: LogicOp,
}

impl ConditionRule {
    /// Create an `equals` rule
    pub fn new(question_id: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        Self {
            question_id: question_id.into(),
            value: value.into(),
            operator: Operator::Equals,
            next_logic: LogicOp::And,
        }
    }

    /// Set the operator
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Set how this rule combines with its next sibling
    pub fn with_next_logic(mut self, logic: LogicOp) -> Self {
        self.next_logic = logic;
        self
    }
}

impl<'de> Deserialize<'de> for ConditionRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        match legacy::node_from_value(&raw).map_err(serde::de::Error::custom)? {
            ConditionNode::Rule(rule) => Ok(rule),
            ConditionNode::Group(_) => Err(serde::de::Error::custom(
                "expected a condition rule, found a group",
            )),
        }
    }
}

/// Ordered collection of rules and nested groups
///
/// Serialized with `kind: "group"`, also at the root of a tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename = "group", rename_all = "camelCase")]
pub struct ConditionGroup {
    /// Children, combined left to right
    pub rules: Vec<ConditionNode>,
    /// Combinator with the next sibling at the parent level
    pub next_logic: LogicOp,
}

impl ConditionGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: ConditionRule) -> Self {
        self.rules.push(ConditionNode::Rule(rule));
        self
    }

    /// Append a nested group
    pub fn with_group(mut self, group: ConditionGroup) -> Self {
        self.rules.push(ConditionNode::Group(group));
        self
    }

    /// Set how this group combines with its next sibling
    pub fn with_next_logic(mut self, logic: LogicOp) -> Self {
        self.next_logic = logic;
        self
    }

    /// Whether the group has no children
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Question ids referenced anywhere in the tree
    pub fn dependencies(&self) -> BTreeSet<&str> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies<'a>(&'a self, deps: &mut BTreeSet<&'a str>) {
        for node in &self.rules {
            match node {
                ConditionNode::Rule(rule) => {
                    deps.insert(rule.question_id.as_str());
                }
                ConditionNode::Group(group) => group.collect_dependencies(deps),
            }
        }
    }

    /// Nesting depth (a group holding only rules has depth 1)
    pub fn depth(&self) -> usize {
        1 + self
            .rules
            .iter()
            .filter_map(|node| match node {
                ConditionNode::Group(group) => Some(group.depth()),
                ConditionNode::Rule(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Iterate over every rule in the tree, depth first
    pub fn iter_rules(&self) -> impl Iterator<Item = &ConditionRule> {
        let mut rules = Vec::new();
        self.collect_rules(&mut rules);
        rules.into_iter()
    }

    fn collect_rules<'a>(&'a self, rules: &mut Vec<&'a ConditionRule>) {
        for node in &self.rules {
            match node {
                ConditionNode::Rule(rule) => rules.push(rule),
                ConditionNode::Group(group) => group.collect_rules(rules),
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConditionGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        legacy::normalize_conditions(&raw)
            .map(Option::unwrap_or_default)
            .map_err(serde::de::Error::custom)
    }
}

/// A node of the tree: either a rule or a nested group
///
/// Each variant writes its own `kind` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionNode {
    /// Leaf comparison
    Rule(ConditionRule),
    /// Nested group
    Group(ConditionGroup),
}

impl ConditionNode {
    /// Combinator with the next sibling
    pub fn next_logic(&self) -> LogicOp {
        match self {
            Self::Rule(rule) => rule.next_logic,
            Self::Group(group) => group.next_logic,
        }
    }
}

impl From<ConditionRule> for ConditionNode {
    fn from(rule: ConditionRule) -> Self {
        Self::Rule(rule)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        Self::Group(group)
    }
}

impl<'de> Deserialize<'de> for ConditionNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        legacy::node_from_value(&raw).map_err(serde::de::Error::custom)
    }
}
