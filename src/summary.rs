use serde::{Deserialize, Serialize};

/// Snapshot of a cluster state transition for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    prev_state: String,
    new_state: String,
    elapsed_ms: u64,
}

impl Summary {
    pub fn new(
        prev_state: impl Into<String>,
        new_state: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            prev_state: prev_state.into(),
            new_state: new_state.into(),
            elapsed_ms,
        }
    }

    /// Membership view the transition started from.
    pub fn prev_state(&self) -> &str {
        &self.prev_state
    }

    /// Membership view the transition moves to.
    pub fn new_state(&self) -> &str {
        &self.new_state
    }

    /// Milliseconds since the transition was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}
