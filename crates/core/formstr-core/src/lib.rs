//! Formstr Core
//!
//! Question model and conditional visibility engine for Nostr-native forms.
//! It includes:
//!
//! - Parsing of `field` tags and the settings JSON they carry
//! - Nested condition trees with per-node AND/OR chaining
//! - Normalization of legacy flat condition lists
//! - Type-aware rule evaluation (choices, numbers, text, dates, times)
//! - Visibility filtering with a configurable error policy
//! - Builder-side validation of condition trees
//!
//! # Example
//!
//! ```
//! use formstr_core::*;
//!
//! let questions = vec![
//!     Question::new("attend", "Can you attend?")
//!         .with_kind(QuestionKind::RadioButton)
//!         .with_choices(vec![Choice::new("yes", "Yes"), Choice::new("no", "No")]),
//!     Question::new("guests", "Number of guests")
//!         .with_kind(QuestionKind::Number)
//!         .with_conditions(ConditionGroup::new().with_rule(ConditionRule::new("attend", "yes"))),
//! ];
//!
//! let answers = AnswerMap::new().with("attend", "yes");
//! let visible = visible_questions(&questions, &answers);
//! assert_eq!(visible.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answers;
pub mod conditions;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod ids;
pub mod question;
pub mod registry;
pub mod template;
pub mod validation;
pub mod visibility;

pub use answers::{Answer, AnswerMap};
pub use conditions::{ConditionGroup, ConditionNode, ConditionRule, LogicOp, Operator, RuleValue};
pub use config::{ErrorPolicy, VisibilityConfig};
pub use error::{ConditionsError, Result};
pub use evaluator::{supported_operators, Evaluator};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use question::{questions_from_tags, Choice, DataKind, Question, QuestionKind};
pub use registry::QuestionRegistry;
pub use template::FieldBuilder;
pub use validation::ConditionValidator;
pub use visibility::{visible_questions, VisibilityCache, VisibilityFilter};
