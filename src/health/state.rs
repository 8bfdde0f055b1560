//! Endpoint health state machine.
//!
//! # States
//! - Active: traffic-eligible (maintenance disabled)
//! - Suspect: suspended after one bad probe (maintenance enabled)
//! - Removed: deleted after a second consecutive bad probe
//!
//! # State Transitions
//! ```text
//! Active  --bad-->  Suspect   (suspend)
//! Active  --good--> Active    (none)
//! Suspect --bad-->  Removed   (remove)
//! Suspect --good--> Active    (resume)
//! ```
//!
//! The state is not stored anywhere; it is recovered every cycle from the
//! maintenance flag. Nothing reaches Removed without passing through Suspect.

use std::time::Duration;

use crate::config::HealthConfig;
use crate::probe::ProbeOutcome;

/// Derived lifecycle position of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Suspect,
    Removed,
}

impl LifecycleState {
    pub fn from_suspended(suspended: bool) -> Self {
        if suspended {
            LifecycleState::Suspect
        } else {
            LifecycleState::Active
        }
    }
}

/// What the registry should do with an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Suspend,
    Resume,
    Remove,
}

/// Outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    /// Maintenance flag afterwards; `None` once removed.
    pub next_suspended: Option<bool>,
}

impl Decision {
    const fn new(action: Action, next_suspended: Option<bool>) -> Self {
        Self {
            action,
            next_suspended,
        }
    }

    pub fn next_state(&self) -> LifecycleState {
        match self.next_suspended {
            Some(suspended) => LifecycleState::from_suspended(suspended),
            None => LifecycleState::Removed,
        }
    }
}

/// Thresholds separating a good probe from a bad one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Probes slower than this are bad.
    pub max_duration: Duration,
    pub expected_status: u16,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(2),
            expected_status: 200,
        }
    }
}

impl From<&HealthConfig> for HealthPolicy {
    fn from(config: &HealthConfig) -> Self {
        Self {
            max_duration: Duration::from_millis(config.max_duration_ms),
            expected_status: config.expected_status,
        }
    }
}

impl HealthPolicy {
    pub fn is_healthy(&self, outcome: &ProbeOutcome) -> bool {
        match outcome {
            ProbeOutcome::Failed(_) => false,
            ProbeOutcome::Completed { status, elapsed } => {
                *status == self.expected_status && *elapsed <= self.max_duration
            }
        }
    }

    /// Map the current maintenance flag and a probe outcome to an action.
    pub fn decide(&self, suspended: bool, outcome: &ProbeOutcome) -> Decision {
        match (suspended, self.is_healthy(outcome)) {
            (false, false) => Decision::new(Action::Suspend, Some(true)),
            (false, true) => Decision::new(Action::None, Some(false)),
            (true, false) => Decision::new(Action::Remove, None),
            (true, true) => Decision::new(Action::Resume, Some(false)),
        }
    }
}

/// [`HealthPolicy::decide`] with the default 2s / 200 policy.
pub fn decide(suspended: bool, outcome: &ProbeOutcome) -> Decision {
    HealthPolicy::default().decide(suspended, outcome)
}
