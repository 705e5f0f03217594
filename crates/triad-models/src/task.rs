//! Task types.
//!
//! A [`Task`] is the caller-supplied description of work. It is built once
//! per invocation and is immutable after submission to a coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Technical difficulty tier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    /// Routine work.
    Low,
    /// Moderate work.
    #[default]
    Medium,
    /// Technically demanding work.
    High,
}

impl Difficulty {
    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::UnknownDifficulty(s.to_string())),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Work submitted to a coordinator.
///
/// The JSON shape uses exactly these field names so tasks written for the
/// existing tooling deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Free-text description.
    #[serde(default)]
    pub description: String,

    /// Subtask labels.
    #[serde(default)]
    pub subtasks: Vec<String>,

    /// Estimated duration in hours.
    #[serde(default)]
    pub estimated_hours: f64,

    /// Dependency labels.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Difficulty tier. Missing means `medium`; unknown values are rejected.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Free-text user input, handed to the primary role's context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,

    /// Free-text user documentation, handed to the primary role's context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_docs: Option<String>,
}

impl Task {
    /// Creates a task with the given description, no subtasks and the default
    /// difficulty.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            subtasks: Vec::new(),
            estimated_hours: 0.0,
            dependencies: Vec::new(),
            difficulty: Difficulty::default(),
            user_input: None,
            user_docs: None,
        }
    }

    /// Sets the subtask labels.
    pub fn with_subtasks<I, S>(mut self, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtasks = subtasks.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the estimated duration in hours.
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = hours;
        self
    }

    /// Sets the dependency labels.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the difficulty tier.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Sets the user input.
    pub fn with_user_input(mut self, input: impl Into<String>) -> Self {
        self.user_input = Some(input.into());
        self
    }

    /// Sets the user documentation.
    pub fn with_user_docs(mut self, docs: impl Into<String>) -> Self {
        self.user_docs = Some(docs.into());
        self
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.estimated_hours.is_finite() {
            return Err(ValidationError::NonFiniteDuration);
        }
        if self.estimated_hours < 0.0 {
            return Err(ValidationError::NegativeDuration(self.estimated_hours));
        }
        Ok(())
    }

    /// Parses and validates a task from JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let task: Task =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        task.validate()?;
        Ok(task)
    }

    /// Derives a narrower task carrying only `subtasks`.
    ///
    /// Used to hand a spawned team its slice of the parent task.
    pub fn slice(&self, subtasks: Vec<String>) -> Self {
        Self {
            description: self.description.clone(),
            subtasks,
            estimated_hours: self.estimated_hours,
            dependencies: self.dependencies.clone(),
            difficulty: self.difficulty,
            user_input: self.user_input.clone(),
            user_docs: self.user_docs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("low".parse::<Difficulty>().unwrap(), Difficulty::Low);
        assert_eq!("HIGH".parse::<Difficulty>().unwrap(), Difficulty::High);
        assert!(matches!(
            "extreme".parse::<Difficulty>(),
            Err(ValidationError::UnknownDifficulty(_))
        ));
    }

    #[test]
    fn test_task_from_json() {
        let json = r#"{
            "description": "Fix typo in README",
            "subtasks": ["Find typo", "Fix it"],
            "estimated_hours": 0.5,
            "difficulty": "low",
            "user_input": "The README has a typo in line 42"
        }"#;

        let task = Task::from_json(json).unwrap();
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.difficulty, Difficulty::Low);
        assert!(task.dependencies.is_empty());
        assert!(task.user_docs.is_none());
    }

    #[test]
    fn test_task_from_json_rejects_unknown_difficulty() {
        let json = r#"{"description": "x", "difficulty": "nightmare"}"#;
        let err = Task::from_json(json).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
        assert!(err.to_string().contains("nightmare"));
    }

    #[test]
    fn test_task_missing_difficulty_is_medium() {
        let task = Task::from_json(r#"{"description": "x"}"#).unwrap();
        assert_eq!(task.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_task_rejects_negative_duration() {
        let task = Task::new("x").with_hours(-1.0);
        assert_eq!(task.validate(), Err(ValidationError::NegativeDuration(-1.0)));
    }

    #[test]
    fn test_task_rejects_non_finite_duration() {
        let task = Task::new("x").with_hours(f64::NAN);
        assert_eq!(task.validate(), Err(ValidationError::NonFiniteDuration));
    }

    #[test]
    fn test_slice_keeps_metadata() {
        let task = Task::new("Build")
            .with_subtasks(["a", "b", "c"])
            .with_difficulty(Difficulty::High);
        let part = task.slice(vec!["b".to_string()]);

        assert_eq!(part.subtasks, vec!["b".to_string()]);
        assert_eq!(part.difficulty, Difficulty::High);
        assert_eq!(part.description, "Build");
    }
}
