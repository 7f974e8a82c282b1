//! Error types for the Formstr core

use thiserror::Error;

/// Main error type for condition loading, evaluation and validation
#[derive(Debug, Error)]
pub enum ConditionsError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A question's settings blob could not be read
    #[error("Malformed settings on question '{question_id}': {message}")]
    MalformedSettings {
        /// Question owning the settings
        question_id: String,
        /// Parser message
        message: String,
    },

    /// A condition tree node has an unrecognised shape
    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    /// A form tag could not be read as a question
    #[error("Invalid field tag: {0}")]
    InvalidField(String),

    /// Dependency question has no answer yet
    #[error("Question '{0}' is unanswered")]
    Unanswered(String),

    /// Referenced question is not part of the form
    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    /// Numeric comparison on a value that is not a number
    #[error("Value '{value}' for question '{question_id}' is not numeric")]
    NotNumeric {
        /// Dependency question
        question_id: String,
        /// Offending value
        value: String,
    },

    /// Condition tree nests deeper than allowed
    #[error("Condition tree depth {depth} exceeds maximum {limit}")]
    DepthExceeded {
        /// Depth reached
        depth: usize,
        /// Configured limit
        limit: usize,
    },

    /// A rule references the question that owns it
    #[error("Question '{0}' has a condition on itself")]
    SelfReference(String),

    /// Operator not offered for the dependency's render type
    #[error("Operator '{operator}' is not supported for {kind} question '{question_id}'")]
    UnsupportedOperator {
        /// Dependency question
        question_id: String,
        /// Render type of the dependency
        kind: String,
        /// Rejected operator
        operator: String,
    },

    /// Questions depend on each other in a loop
    #[error("Circular condition dependency involving question '{0}'")]
    CyclicDependency(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient Result type using ConditionsError
pub type Result<T> = std::result::Result<T, ConditionsError>;

impl ConditionsError {
    /// Create a malformed settings error
    pub fn malformed_settings(question_id: impl Into<String>, message: impl Into<String>) -> Self {
        ConditionsError::MalformedSettings {
            question_id: question_id.into(),
            message: message.into(),
        }
    }

    /// Create a malformed condition error
    pub fn malformed_condition(msg: impl Into<String>) -> Self {
        ConditionsError::MalformedCondition(msg.into())
    }

    /// Create an invalid field error
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        ConditionsError::InvalidField(msg.into())
    }

    /// Create a not numeric error
    pub fn not_numeric(question_id: impl Into<String>, value: impl Into<String>) -> Self {
        ConditionsError::NotNumeric {
            question_id: question_id.into(),
            value: value.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ConditionsError::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        ConditionsError::Config(msg.into())
    }

    /// Whether this error only means "the rule does not hold"
    ///
    /// These are absorbed into a `false` rule result instead of reaching the
    /// question-level error policy.
    pub fn is_rule_miss(&self) -> bool {
        matches!(
            self,
            ConditionsError::Unanswered(_)
                | ConditionsError::QuestionNotFound(_)
                | ConditionsError::NotNumeric { .. }
        )
    }
}
