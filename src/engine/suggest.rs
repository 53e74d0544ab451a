//! Title-phrase dependency suggestions.
//!
//! Matching is plain case-insensitive substring search: a title containing
//! "subcontract" triggers the "contract" rule.

use crate::error::EngineError;
use crate::types::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A trigger phrase and the phrases of tasks it likely depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRule {
    pub trigger: String,
    pub depends_on: Vec<String>,
}

impl SuggestionRule {
    pub fn new(trigger: &str, depends_on: &[&str]) -> Self {
        Self {
            trigger: trigger.to_string(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Built-in rule table.
pub fn default_rules() -> Vec<SuggestionRule> {
    vec![
        SuggestionRule::new("client meeting", &["prepare presentation", "prepare agenda"]),
        SuggestionRule::new("presentation", &["gather data", "create slides"]),
        SuggestionRule::new("deploy", &["code review", "run tests"]),
        SuggestionRule::new("release", &["changelog", "code review"]),
        SuggestionRule::new("contract", &["legal review", "review terms"]),
        SuggestionRule::new("report", &["gather data", "analyze"]),
        SuggestionRule::new("launch", &["marketing plan", "final review"]),
        SuggestionRule::new("interview", &["review resume", "prepare questions"]),
    ]
}

/// Suggests dependencies for a task from its title.
#[derive(Debug, Clone)]
pub struct DependencySuggester {
    rules: Vec<SuggestionRule>,
    dedup: bool,
}

impl Default for DependencySuggester {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl DependencySuggester {
    pub fn new(rules: Vec<SuggestionRule>) -> Self {
        Self {
            rules,
            dedup: false,
        }
    }

    /// Drop repeated ids when several rules or phrases hit the same task.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Suggest dependency ids for `task_id` from the other tasks in `tasks`.
    ///
    /// For every rule whose trigger appears in the task's title, each
    /// dependency phrase contributes the first other task whose title
    /// contains it. Without dedup the same id may appear more than once.
    pub fn suggest(&self, task_id: &str, tasks: &[Task]) -> Result<Vec<String>, EngineError> {
        let task = tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(task_id))?;
        let title = task.title.to_lowercase();

        // Lowercase once rather than per phrase.
        let candidates: Vec<(&str, String)> = tasks
            .iter()
            .filter(|t| t.id != task_id)
            .map(|t| (t.id.as_str(), t.title.to_lowercase()))
            .collect();

        let mut suggestions = Vec::new();
        for rule in &self.rules {
            if !title.contains(&rule.trigger.to_lowercase()) {
                continue;
            }
            for phrase in &rule.depends_on {
                let phrase = phrase.to_lowercase();
                if let Some((id, _)) = candidates.iter().find(|(_, t)| t.contains(&phrase)) {
                    debug!(task_id, trigger = %rule.trigger, phrase = %phrase, suggested = %id, "Suggested dependency");
                    suggestions.push(id.to_string());
                }
            }
        }

        if self.dedup {
            let mut seen = HashSet::new();
            suggestions.retain(|id| seen.insert(id.clone()));
        }

        Ok(suggestions)
    }
}
