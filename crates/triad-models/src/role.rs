//! Role types.
//!
//! A team has one role of each [`RoleKind`]. In dual-layer mode every role
//! is paired with a monitor counterpart on the [`Layer::Monitor`] layer.
//! What a role may do is decided by its [`Capabilities`], not by its type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three role kinds of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Primary executor; focused on user context, does not read logs.
    Primary,
    /// Helper and backup; reads logs, resolves bugs, substitutes.
    Assistant,
    /// Doctor and arbitrator; settles disputes and cures what the assistant cannot.
    Arbitrator,
}

impl RoleKind {
    /// All role kinds in team order.
    pub const ALL: [RoleKind; 3] = [RoleKind::Primary, RoleKind::Assistant, RoleKind::Arbitrator];

    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Assistant => "assistant",
            Self::Arbitrator => "arbitrator",
        }
    }

    /// Capability set of this role kind.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Primary => Capabilities {
                can_read_logs: false,
                can_write_context: true,
                can_arbitrate: false,
            },
            Self::Assistant => Capabilities {
                can_read_logs: true,
                can_write_context: false,
                can_arbitrate: false,
            },
            Self::Arbitrator => Capabilities {
                can_read_logs: true,
                can_write_context: false,
                can_arbitrate: true,
            },
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution layer a role lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// User-facing roles.
    #[default]
    Main,
    /// Supervisory counterparts bound to the secondary backend.
    Monitor,
}

/// What a role is allowed to do against shared memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May read the activity log.
    pub can_read_logs: bool,
    /// May write user context.
    pub can_write_context: bool,
    /// May append binding decisions.
    pub can_arbitrate: bool,
}

impl Capabilities {
    /// Read-only capability set of an unpromoted monitor.
    pub const MONITOR: Capabilities = Capabilities {
        can_read_logs: true,
        can_write_context: false,
        can_arbitrate: false,
    };
}

/// A role within a team: its kind plus the layer it runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId {
    /// Role kind.
    pub kind: RoleKind,
    /// Layer.
    #[serde(default)]
    pub layer: Layer,
}

impl RoleId {
    /// A main-layer role.
    pub const fn main(kind: RoleKind) -> Self {
        Self {
            kind,
            layer: Layer::Main,
        }
    }

    /// The monitor counterpart of `kind`.
    pub const fn monitor(kind: RoleKind) -> Self {
        Self {
            kind,
            layer: Layer::Monitor,
        }
    }

    /// Shorthand for the main primary role.
    pub const PRIMARY: RoleId = RoleId::main(RoleKind::Primary);
    /// Shorthand for the main assistant role.
    pub const ASSISTANT: RoleId = RoleId::main(RoleKind::Assistant);
    /// Shorthand for the main arbitrator role.
    pub const ARBITRATOR: RoleId = RoleId::main(RoleKind::Arbitrator);

    /// Returns the paired role on the other layer.
    pub fn counterpart(&self) -> Self {
        match self.layer {
            Layer::Main => Self::monitor(self.kind),
            Layer::Monitor => Self::main(self.kind),
        }
    }

    /// Capabilities of this role before any promotion.
    pub fn capabilities(&self) -> Capabilities {
        match self.layer {
            Layer::Main => self.kind.capabilities(),
            Layer::Monitor => Capabilities::MONITOR,
        }
    }

    /// Stable label, e.g. `primary` or `primary-monitor`.
    pub fn label(&self) -> String {
        match self.layer {
            Layer::Main => self.kind.as_str().to_string(),
            Layer::Monitor => format!("{}-monitor", self.kind.as_str()),
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// What a role is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Not assigned anything.
    #[default]
    Idle,
    /// Working.
    Busy,
    /// On a break.
    Resting,
    /// Covering for another role.
    Substituting,
    /// Watching without acting.
    Standby,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Resting => "resting",
            Self::Substituting => "substituting",
            Self::Standby => "standby",
        };
        f.write_str(label)
    }
}

/// Status record of one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleStatus {
    /// Role this status belongs to.
    pub role: RoleId,
    /// Current activity label (usually a subtask).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// Current activity.
    pub activity: Activity,
    /// When the status was last written.
    pub updated_at: DateTime<Utc>,
}

impl RoleStatus {
    /// Creates a status stamped now.
    pub fn new(role: RoleId, activity: Activity, current: Option<String>) -> Self {
        Self {
            role,
            current,
            activity,
            updated_at: Utc::now(),
        }
    }
}
