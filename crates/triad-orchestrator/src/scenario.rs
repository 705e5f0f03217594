//! Scripted signals that drive a team through its detours.
//!
//! Roles are stand-ins, so stalls, disagreements and breaks are injected per
//! subtask. A scenario file looks like:
//!
//! ```json
//! {
//!   "Build auth service": [
//!     { "signal": "stuck", "bug": "TypeError: unsupported operand", "assistant_can_fix": true }
//!   ],
//!   "Design API gateway": [
//!     { "signal": "dispute", "primary": "Use async", "assistant": "Use sync" },
//!     { "signal": "fatigue" }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use triad_models::RoleKind;

use crate::error::{OrchestratorError, Result};

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// The primary hits a wall, optionally reporting a bug.
    Stuck {
        #[serde(default)]
        bug: Option<String>,
        #[serde(default = "default_true")]
        assistant_can_fix: bool,
    },
    /// Primary and assistant record conflicting decisions.
    Dispute { primary: String, assistant: String },
    /// The primary needs a break; the assistant substitutes.
    Fatigue,
    /// The role stops responding on its next action.
    Hang { role: RoleKind },
}

fn default_true() -> bool {
    true
}

/// Signals keyed by subtask label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    signals: HashMap<String, Vec<Signal>>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `signal` for `subtask`, after any already present.
    pub fn on(mut self, subtask: impl Into<String>, signal: Signal) -> Self {
        self.signals.entry(subtask.into()).or_default().push(signal);
        self
    }

    /// Signals for `subtask`, in order.
    pub fn signals_for(&self, subtask: &str) -> &[Signal] {
        self.signals.get(subtask).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OrchestratorError::Configuration(format!("invalid scenario: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let scenario = Scenario::new()
            .on("a", Signal::Fatigue)
            .on("a", Signal::Hang { role: RoleKind::Primary });
        assert_eq!(
            scenario.signals_for("a"),
            &[Signal::Fatigue, Signal::Hang { role: RoleKind::Primary }]
        );
        assert!(scenario.signals_for("b").is_empty());
    }

    #[test]
    fn test_from_json() {
        let scenario = Scenario::from_json(
            r#"{
                "parse": [{"signal": "stuck"}],
                "design": [{"signal": "dispute", "primary": "async", "assistant": "sync"}],
                "deploy": [{"signal": "hang", "role": "arbitrator"}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            scenario.signals_for("parse"),
            &[Signal::Stuck {
                bug: None,
                assistant_can_fix: true
            }]
        );
        assert!(matches!(
            scenario.signals_for("design")[0],
            Signal::Dispute { .. }
        ));
        assert_eq!(
            scenario.signals_for("deploy"),
            &[Signal::Hang {
                role: RoleKind::Arbitrator
            }]
        );
    }

    #[test]
    fn test_unknown_signal_rejected() {
        let err = Scenario::from_json(r#"{"x": [{"signal": "explode"}]}"#).unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }
}
