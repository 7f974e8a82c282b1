//! Visibility engine configuration

use crate::{ConditionsError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable selecting the error policy (`show` or `hide`)
pub const ERROR_POLICY_ENV: &str = "FORMSTR_CONDITIONS_ERROR_POLICY";

/// Environment variable bounding condition tree depth
pub const MAX_DEPTH_ENV: &str = "FORMSTR_CONDITIONS_MAX_DEPTH";

/// What to do with a question whose own conditions cannot be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Show the question (fail open)
    #[default]
    ShowQuestion,
    /// Hide the question (fail closed)
    HideQuestion,
}

impl ErrorPolicy {
    /// Visibility decision applied when evaluation fails
    pub fn fallback(&self) -> bool {
        matches!(self, Self::ShowQuestion)
    }
}

impl FromStr for ErrorPolicy {
    type Err = ConditionsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "show" | "show_question" | "open" => Ok(Self::ShowQuestion),
            "hide" | "hide_question" | "closed" => Ok(Self::HideQuestion),
            other => Err(ConditionsError::config(format!(
                "Unknown error policy '{}', expected 'show' or 'hide'",
                other
            ))),
        }
    }
}

/// Configuration shared by the evaluator, filter and validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Policy for questions whose conditions fail to load or evaluate
    pub error_policy: ErrorPolicy,

    /// Maximum nesting depth of a condition tree
    pub max_depth: usize,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::ShowQuestion,
            max_depth: 32,
        }
    }
}

impl VisibilityConfig {
    /// Load from environment variables
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let error_policy = match std::env::var(ERROR_POLICY_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; keeping {:?}", e, defaults.error_policy);
                defaults.error_policy
            }),
            Err(_) => defaults.error_policy,
        };

        Self {
            error_policy,
            max_depth: std::env::var(MAX_DEPTH_ENV)
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|depth: &usize| *depth > 0)
                .unwrap_or(defaults.max_depth),
        }
    }

    /// Set the error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Set the maximum tree depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
