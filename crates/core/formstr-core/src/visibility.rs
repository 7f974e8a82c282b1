/*!
# Visibility Filter

Decides which questions a respondent currently sees.

The filter is a pure function of the question list and the answer map, so it
can be re-run on every input event. [`VisibilityCache`] adds optional
memoization keyed by the answers each question's tree actually reads.
*/

use crate::answers::{Answer, AnswerMap};
use crate::config::VisibilityConfig;
use crate::evaluator::Evaluator;
use crate::question::Question;
use std::collections::HashMap;

/// Visibility decisions for one form
#[derive(Debug, Clone)]
pub struct VisibilityFilter<'q> {
    evaluator: Evaluator<'q>,
}

impl<'q> VisibilityFilter<'q> {
    /// Create a filter with default configuration
    pub fn new(questions: &'q [Question]) -> Self {
        Self::with_config(questions, VisibilityConfig::default())
    }

    /// Create a filter with explicit configuration
    pub fn with_config(questions: &'q [Question], config: VisibilityConfig) -> Self {
        Self {
            evaluator: Evaluator::with_config(questions, config),
        }
    }

    /// Underlying evaluator
    pub fn evaluator(&self) -> &Evaluator<'q> {
        &self.evaluator
    }

    /// Questions in form order
    pub fn questions(&self) -> &'q [Question] {
        self.evaluator.registry().questions()
    }

    /// Whether a question is shown for the given answers
    ///
    /// Questions without conditions are always shown. A question whose own
    /// conditions cannot be loaded follows the configured error policy.
    pub fn is_visible(&self, question: &Question, answers: &AnswerMap) -> bool {
        match question.conditions() {
            Ok(None) => true,
            Ok(Some(group)) => self.evaluator.evaluate_group(group, answers),
            Err(e) => {
                let fallback = self.evaluator.config().error_policy.fallback();
                tracing::warn!(
                    "Cannot evaluate conditions of {}: {}; visible = {}",
                    question.id(),
                    e,
                    fallback
                );
                fallback
            }
        }
    }

    /// Visible questions, in form order
    pub fn visible_questions(&self, answers: &AnswerMap) -> Vec<&'q Question> {
        let visible: Vec<&'q Question> = self
            .questions()
            .iter()
            .filter(|q| self.is_visible(q, answers))
            .collect();
        tracing::debug!(
            "Filtering questions: {} total, {} visible",
            self.questions().len(),
            visible.len()
        );
        visible
    }

    /// Decision for every question
    pub fn visibility_map(&self, answers: &AnswerMap) -> HashMap<&'q str, bool> {
        self.questions()
            .iter()
            .map(|q| (q.id(), self.is_visible(q, answers)))
            .collect()
    }

    /// Visible required questions that still have no answer
    pub fn missing_required(&self, answers: &AnswerMap) -> Vec<&'q Question> {
        self.questions()
            .iter()
            .filter(|q| q.is_required() && !answers.is_answered(q.id()))
            .filter(|q| self.is_visible(q, answers))
            .collect()
    }
}

/// Visible questions of a form for the given answers
pub fn visible_questions<'q>(questions: &'q [Question], answers: &AnswerMap) -> Vec<&'q Question> {
    VisibilityFilter::new(questions).visible_questions(answers)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    settings: String,
    key: Vec<Option<Answer>>,
    visible: bool,
}

/// Memoized visibility decisions of one filter
///
/// The cache owns the filter it serves, so every decision is made under the
/// same questions and configuration. A decision is reused while the answers
/// of the questions its tree references are unchanged. Call
/// [`invalidate`](Self::invalidate) after the answers are replaced wholesale.
#[derive(Debug, Clone)]
pub struct VisibilityCache<'q> {
    filter: VisibilityFilter<'q>,
    entries: HashMap<String, CacheEntry>,
    hits: usize,
    misses: usize,
}

impl<'q> VisibilityCache<'q> {
    /// Create an empty cache over `filter`
    pub fn new(filter: VisibilityFilter<'q>) -> Self {
        Self {
            filter,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Filter whose decisions are cached
    pub fn filter(&self) -> &VisibilityFilter<'q> {
        &self.filter
    }

    /// Cached [`VisibilityFilter::is_visible`]
    pub fn is_visible(&mut self, question: &Question, answers: &AnswerMap) -> bool {
        let group = match question.conditions() {
            Ok(Some(group)) => group,
            _ => return self.filter.is_visible(question, answers),
        };

        let key: Vec<Option<Answer>> = group
            .dependencies()
            .into_iter()
            .map(|dep| answers.get(dep).cloned())
            .collect();

        if let Some(entry) = self.entries.get(question.id()) {
            if entry.key == key && entry.settings == question.settings_json() {
                self.hits += 1;
                return entry.visible;
            }
        }

        self.misses += 1;
        let visible = self.filter.is_visible(question, answers);
        self.entries.insert(
            question.id().to_string(),
            CacheEntry {
                settings: question.settings_json().to_string(),
                key,
                visible,
            },
        );
        visible
    }

    /// Cached [`VisibilityFilter::visible_questions`]
    pub fn visible_questions(&mut self, answers: &AnswerMap) -> Vec<&'q Question> {
        let questions = self.filter.questions();
        questions
            .iter()
            .filter(|q| self.is_visible(q, answers))
            .collect()
    }

    /// Drop every cached decision
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of decisions served from the cache
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of decisions computed
    pub fn misses(&self) -> usize {
        self.misses
    }
}
