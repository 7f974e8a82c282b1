//! Respondent answers keyed by question id

use crate::conditions::scalar_to_string;
use crate::{ConditionsError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single answer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Single value (text, choice id, number, date, time)
    Text(String),
    /// Selected choice ids of a multi-select question
    Choices(Vec<String>),
}

impl Answer {
    /// Build from JSON; `null` is an empty answer and scalars are read as text
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Text(String::new())),
            Value::Array(items) => Ok(Self::Choices(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            Value::Object(_) => Err(ConditionsError::validation(
                "answer must be a string, a number or a list of strings",
            )),
            scalar => Ok(Self::Text(scalar_to_string(scalar).unwrap_or_default())),
        }
    }

    /// Whether this counts as "unanswered"
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Choices(values) => values.is_empty(),
        }
    }

    /// Values as a list (a single value is a one-element list)
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => vec![s.as_str()],
            Self::Choices(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Values joined with commas
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Choices(values) => values.join(","),
        }
    }
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for Answer {
    fn from(values: Vec<String>) -> Self {
        Self::Choices(values)
    }
}

impl From<Vec<&str>> for Answer {
    fn from(values: Vec<&str>) -> Self {
        Self::Choices(values.into_iter().map(String::from).collect())
    }
}

/// In-progress answers of one respondent
///
/// Created empty when a form is opened and updated on every input event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnswerMap {
    answers: HashMap<String, Answer>,
}

impl AnswerMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an input event; an empty answer clears the question
    pub fn record(&mut self, question_id: impl Into<String>, answer: impl Into<Answer>) {
        let question_id = question_id.into();
        let answer = answer.into();
        if answer.is_empty() {
            self.answers.remove(&question_id);
        } else {
            self.answers.insert(question_id, answer);
        }
    }

    /// Builder-style [`record`](Self::record)
    pub fn with(mut self, question_id: impl Into<String>, answer: impl Into<Answer>) -> Self {
        self.record(question_id, answer);
        self
    }

    /// Remove a question's answer
    pub fn clear(&mut self, question_id: &str) -> Option<Answer> {
        self.answers.remove(question_id)
    }

    /// Non-empty answer for a question
    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id).filter(|a| !a.is_empty())
    }

    /// Whether a question has a non-empty answer
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.get(question_id).is_some()
    }

    /// Number of stored answers
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Whether nothing has been answered
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Iterate over stored answers
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.answers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'de> Deserialize<'de> for AnswerMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = HashMap::<String, Answer>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Answer>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.record(k, v);
        }
        map
    }
}
