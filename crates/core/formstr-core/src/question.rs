/*!
# Questions

Read-only question records as they arrive in a form template.

A question travels as a Nostr tag:

```text
["field", id, dataKind, label, choicesJson, settingsJson]
```

The settings blob is parsed once, when the record is built. Malformed settings
never fail construction: the render type falls back to `shortText` and the
failure is kept so the visibility filter can apply its error policy.
*/

use crate::conditions::{legacy, ConditionGroup};
use crate::{ConditionsError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Tag name marking a question in a form template
pub const FIELD_TAG: &str = "field";

/// Widget kind of a question, which decides comparison semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "&'static str")]
pub enum QuestionKind {
    /// Single line text
    #[default]
    ShortText,
    /// Multi line text
    Paragraph,
    /// Single choice, radio buttons
    RadioButton,
    /// Single choice, dropdown
    Dropdown,
    /// Multiple choice
    Checkboxes,
    /// Numeric input
    Number,
    /// Date picker
    Date,
    /// Time picker
    Time,
}

impl QuestionKind {
    /// Wire name (`renderElement`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortText => "shortText",
            Self::Paragraph => "paragraph",
            Self::RadioButton => "radioButton",
            Self::Dropdown => "dropdown",
            Self::Checkboxes => "checkboxes",
            Self::Number => "number",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    /// Parse a `renderElement`, degrading unknown kinds to free text
    pub fn parse(s: &str) -> Self {
        match s {
            "shortText" => Self::ShortText,
            "paragraph" => Self::Paragraph,
            "radioButton" => Self::RadioButton,
            "dropdown" => Self::Dropdown,
            "checkboxes" => Self::Checkboxes,
            "number" => Self::Number,
            "date" => Self::Date,
            "time" => Self::Time,
            other => {
                tracing::debug!("Unknown render element '{}', treating as shortText", other);
                Self::ShortText
            }
        }
    }

    /// Whether answers are picked from the question's choices
    pub fn has_choices(&self) -> bool {
        matches!(self, Self::RadioButton | Self::Dropdown | Self::Checkboxes)
    }

    /// Data kind stored alongside this render type
    pub fn data_kind(&self) -> DataKind {
        match self {
            Self::ShortText | Self::Paragraph => DataKind::Text,
            Self::RadioButton | Self::Dropdown | Self::Checkboxes => DataKind::Option,
            Self::Number => DataKind::Number,
            Self::Date => DataKind::Date,
            Self::Time => DataKind::Time,
        }
    }
}

impl From<QuestionKind> for &'static str {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Primitive data kind stored in the tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Free text
    #[default]
    Text,
    /// Choice ids
    Option,
    /// Number
    Number,
    /// Date
    Date,
    /// Time
    Time,
}

impl DataKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Option => "option",
            Self::Number => "number",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    /// Parse a wire name, unknown kinds become text
    pub fn parse(s: &str) -> Self {
        match s {
            "option" => Self::Option,
            "number" => Self::Number,
            "date" => Self::Date,
            "time" => Self::Time,
            _ => Self::Text,
        }
    }
}

/// Selectable choice of an option question
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    /// Stable choice id, stored in answers
    pub id: String,
    /// Display label
    pub label: String,
}

impl Choice {
    /// Create a choice
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Parse a choices blob (`[[id, label, ...], ...]`), empty on any failure
pub fn parse_choices(json: &str) -> Vec<Choice> {
    if json.trim().is_empty() {
        return Vec::new();
    }
    let entries: Vec<Vec<Value>> = match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Ignoring malformed choices: {}", e);
            return Vec::new();
        }
    };
    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.first()?.as_str()?;
            let label = entry.get(1).and_then(Value::as_str).unwrap_or_default();
            Some(Choice::new(id, label))
        })
        .collect()
}

/// Encode choices as a choices blob
pub fn encode_choices(choices: &[Choice]) -> String {
    let entries: Vec<[&str; 2]> = choices
        .iter()
        .map(|c| [c.id.as_str(), c.label.as_str()])
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Clone, PartialEq)]
enum LoadedConditions {
    None,
    Tree(ConditionGroup),
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
struct ParsedSettings {
    kind: QuestionKind,
    required: bool,
    conditions: LoadedConditions,
}

impl Default for ParsedSettings {
    fn default() -> Self {
        Self {
            kind: QuestionKind::ShortText,
            required: false,
            conditions: LoadedConditions::None,
        }
    }
}

fn parse_settings(question_id: &str, json: &str) -> ParsedSettings {
    if json.trim().is_empty() {
        return ParsedSettings::default();
    }

    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Malformed settings on question {}: {}", question_id, e);
            return ParsedSettings {
                conditions: LoadedConditions::Malformed(e.to_string()),
                ..Default::default()
            };
        }
    };

    let Some(object) = value.as_object() else {
        return ParsedSettings::default();
    };

    let kind = object
        .get("renderElement")
        .and_then(Value::as_str)
        .map(QuestionKind::parse)
        .unwrap_or_default();
    let required = object
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let conditions = match object.get("conditions") {
        None => LoadedConditions::None,
        Some(raw) => match legacy::normalize_conditions(raw) {
            Ok(Some(group)) if !group.is_empty() => LoadedConditions::Tree(group),
            Ok(_) => LoadedConditions::None,
            Err(e) => {
                tracing::warn!("Malformed conditions on question {}: {}", question_id, e);
                LoadedConditions::Malformed(e.to_string())
            }
        },
    };

    ParsedSettings {
        kind,
        required,
        conditions,
    }
}

/// A question of a form
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: String,
    label: String,
    data_kind: DataKind,
    choices_json: String,
    choices: Vec<Choice>,
    settings_json: String,
    settings: ParsedSettings,
}

impl Question {
    /// Create a free-text question with empty settings
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_kind: DataKind::Text,
            choices_json: "[]".to_string(),
            choices: Vec::new(),
            settings_json: "{}".to_string(),
            settings: ParsedSettings::default(),
        }
    }

    /// Build from raw blobs, as stored in a field tag
    pub fn from_parts(
        id: impl Into<String>,
        data_kind: DataKind,
        label: impl Into<String>,
        choices_json: impl Into<String>,
        settings_json: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let choices_json = choices_json.into();
        let settings_json = settings_json.into();
        let choices = parse_choices(&choices_json);
        let settings = parse_settings(&id, &settings_json);
        Self {
            id,
            label: label.into(),
            data_kind,
            choices_json,
            choices,
            settings_json,
            settings,
        }
    }

    /// Build from a `field` tag
    pub fn from_tag<S: AsRef<str>>(tag: &[S]) -> Result<Self> {
        let part = |idx: usize| tag.get(idx).map(|s| s.as_ref());

        match part(0) {
            Some(FIELD_TAG) => {}
            Some(other) => {
                return Err(ConditionsError::invalid_field(format!(
                    "expected a '{}' tag, found '{}'",
                    FIELD_TAG, other
                )))
            }
            None => return Err(ConditionsError::invalid_field("empty tag")),
        }

        let id = part(1)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConditionsError::invalid_field("field tag is missing an id"))?;

        Ok(Self::from_parts(
            id,
            DataKind::parse(part(2).unwrap_or_default()),
            part(3).unwrap_or_default(),
            part(4).unwrap_or("[]"),
            part(5).unwrap_or("{}"),
        ))
    }

    /// Encode as a `field` tag
    pub fn to_tag(&self) -> Vec<String> {
        vec![
            FIELD_TAG.to_string(),
            self.id.clone(),
            self.data_kind.as_str().to_string(),
            self.label.clone(),
            self.choices_json.clone(),
            self.settings_json.clone(),
        ]
    }

    /// Set the data kind
    pub fn with_data_kind(mut self, data_kind: DataKind) -> Self {
        self.data_kind = data_kind;
        self
    }

    /// Replace the choices
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices_json = encode_choices(&choices);
        self.choices = choices;
        self
    }

    /// Replace the raw settings blob
    pub fn with_settings_json(mut self, settings_json: impl Into<String>) -> Self {
        self.settings_json = settings_json.into();
        self.settings = parse_settings(&self.id, &self.settings_json);
        self
    }

    /// Set `renderElement` in the settings blob
    pub fn with_kind(self, kind: QuestionKind) -> Self {
        self.with_setting("renderElement", Value::String(kind.as_str().to_string()))
    }

    /// Set `required` in the settings blob
    pub fn with_required(self, required: bool) -> Self {
        self.with_setting("required", Value::Bool(required))
    }

    /// Store a condition tree in the settings blob
    pub fn with_conditions(self, conditions: ConditionGroup) -> Self {
        let value = serde_json::to_value(&conditions).unwrap_or(Value::Null);
        self.with_setting("conditions", value)
    }

    fn with_setting(self, key: &str, value: Value) -> Self {
        let mut object = serde_json::from_str::<Value>(&self.settings_json)
            .ok()
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        object.insert(key.to_string(), value);
        let json = Value::Object(object).to_string();
        self.with_settings_json(json)
    }

    /// Question id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Primitive data kind
    pub fn data_kind(&self) -> DataKind {
        self.data_kind
    }

    /// Selectable choices (empty for non-option questions)
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Label of a choice id
    pub fn choice_label(&self, choice_id: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.id == choice_id)
            .map(|c| c.label.as_str())
    }

    /// Raw settings blob
    pub fn settings_json(&self) -> &str {
        &self.settings_json
    }

    /// Render type, `shortText` when settings are missing or malformed
    pub fn kind(&self) -> QuestionKind {
        self.settings.kind
    }

    /// Whether the question must be answered when visible
    pub fn is_required(&self) -> bool {
        self.settings.required
    }

    /// Condition tree controlling this question's visibility
    ///
    /// `Ok(None)` when there are no conditions or the tree is empty.
    pub fn conditions(&self) -> Result<Option<&ConditionGroup>> {
        match &self.settings.conditions {
            LoadedConditions::None => Ok(None),
            LoadedConditions::Tree(group) => Ok(Some(group)),
            LoadedConditions::Malformed(message) => Err(ConditionsError::malformed_settings(
                self.id.clone(),
                message.clone(),
            )),
        }
    }
}

/// Read every `field` tag of a form template, skipping other tags
///
/// Field tags that cannot be read are logged and skipped.
pub fn questions_from_tags<S: AsRef<str>>(tags: &[Vec<S>]) -> Vec<Question> {
    tags.iter()
        .filter(|tag| tag.first().map(|t| t.as_ref()) == Some(FIELD_TAG))
        .filter_map(|tag| match Question::from_tag(tag) {
            Ok(question) => Some(question),
            Err(e) => {
                tracing::warn!("Skipping field tag: {}", e);
                None
            }
        })
        .collect()
}
