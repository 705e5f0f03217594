//! Complexity scoring.
//!
//! ```text
//! score = subtasks
//!       + (hours > 8 ? 2 : hours > 4 ? 1 : 0)
//!       + dependencies
//!       + (high ? 3 : medium ? 1 : 0)
//! ```
//!
//! The score depends only on the subtask count, the duration, the
//! dependency count and the difficulty. Descriptions and user context do
//! not count.

use serde::Serialize;
use triad_models::{Difficulty, Task};

/// Score split into its four terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityBreakdown {
    pub subtasks: u32,
    pub duration: u32,
    pub dependencies: u32,
    pub difficulty: u32,
}

impl ComplexityBreakdown {
    pub fn total(&self) -> u32 {
        self.subtasks + self.duration + self.dependencies + self.difficulty
    }
}

fn duration_term(hours: f64) -> u32 {
    if hours > 8.0 {
        2
    } else if hours > 4.0 {
        1
    } else {
        0
    }
}

fn difficulty_term(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::High => 3,
        Difficulty::Medium => 1,
        Difficulty::Low => 0,
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub fn breakdown(task: &Task) -> ComplexityBreakdown {
    ComplexityBreakdown {
        subtasks: count(task.subtasks.len()),
        duration: duration_term(task.estimated_hours),
        dependencies: count(task.dependencies.len()),
        difficulty: difficulty_term(task.difficulty),
    }
}

/// Complexity score of a task.
pub fn score(task: &Task) -> u32 {
    breakdown(task).total()
}

/// Number of extra teams for a score.
pub fn teams_for_score(score: u32) -> usize {
    match score {
        0..=3 => 0,
        4..=7 => 1,
        8..=12 => 2,
        _ => 3,
    }
}

/// Number of extra teams a task needs.
pub fn assess(task: &Task) -> usize {
    teams_for_score(score(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_task_scores_two() {
        let task = Task::new("Fix typo")
            .with_subtasks(["a"])
            .with_hours(1.0)
            .with_difficulty(Difficulty::Medium);
        assert_eq!(score(&task), 2);
        assert_eq!(assess(&task), 0);
    }

    #[test]
    fn test_medium_task_scores_six() {
        let task = Task::new("Medium feature")
            .with_subtasks(["Design", "Implement", "Test"])
            .with_hours(6.0)
            .with_dependencies(["api"])
            .with_difficulty(Difficulty::Medium);
        assert_eq!(score(&task), 6);
        assert_eq!(assess(&task), 1);
    }

    #[test]
    fn test_complex_task_scores_fourteen() {
        let task = Task::new("Complex refactor")
            .with_subtasks(["Analyze", "Plan", "Refactor core", "Refactor modules", "Test", "Deploy"])
            .with_hours(16.0)
            .with_dependencies(["Database", "API", "Frontend"])
            .with_difficulty(Difficulty::High);
        assert_eq!(score(&task), 14);
        assert_eq!(assess(&task), 3);
    }

    #[test]
    fn test_duration_boundaries() {
        assert_eq!(duration_term(4.0), 0);
        assert_eq!(duration_term(4.5), 1);
        assert_eq!(duration_term(8.0), 1);
        assert_eq!(duration_term(8.01), 2);
    }

    #[test]
    fn test_banding_table() {
        let expected = [
            (0, 0),
            (3, 0),
            (4, 1),
            (7, 1),
            (8, 2),
            (12, 2),
            (13, 3),
            (100, 3),
        ];
        for (score, teams) in expected {
            assert_eq!(teams_for_score(score), teams, "score {}", score);
        }
    }

    #[test]
    fn test_low_scores_never_spawn() {
        for subtasks in 0..=3usize {
            let task = Task::new("t")
                .with_subtasks((0..subtasks).map(|i| format!("s{}", i)))
                .with_difficulty(Difficulty::Low);
            assert!(score(&task) <= 3);
            assert_eq!(assess(&task), 0);
        }
    }

    #[test]
    fn test_score_ignores_description_and_context() {
        let a = Task::new("one").with_subtasks(["x", "y"]).with_hours(5.0);
        let b = Task::new("something else entirely")
            .with_subtasks(["p", "q"])
            .with_hours(5.0)
            .with_user_input("lots of context")
            .with_user_docs("docs");
        assert_eq!(score(&a), score(&b));
        assert_eq!(breakdown(&a), breakdown(&b));
    }
}
