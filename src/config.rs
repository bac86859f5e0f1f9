use {
    super::{Priority, TransitionError, TransitionResult, node::UpStates},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Delay before a failed bucket info request is sent again.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Tunables of a cluster state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Milliseconds to wait before retrying a failed request.
    pub retry_delay_ms: u64,

    /// Node states in which a storage node is asked for bucket info.
    pub storage_up_states: UpStates,

    /// Priority of bucket info requests.
    pub request_priority: Priority,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            storage_up_states: UpStates::default(),
            request_priority: Priority::High,
        }
    }
}

impl TransitionConfig {
    /// Returns the same config with a different retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Returns the same config with different storage up states.
    pub fn with_storage_up_states(mut self, states: UpStates) -> Self {
        self.storage_up_states = states;
        self
    }

    /// Returns the same config with a different request priority.
    pub fn with_request_priority(mut self, priority: Priority) -> Self {
        self.request_priority = priority;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Checks the config is usable.
    pub fn validate(&self) -> TransitionResult<()> {
        if self.retry_delay_ms == 0 {
            return Err(TransitionError::ZeroRetryDelay);
        }
        if self.storage_up_states.is_empty() {
            return Err(TransitionError::NoUpStates);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::node::NodeState};

    #[test]
    fn defaults() {
        let config = TransitionConfig::default();
        assert_eq!(config.retry_delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation() {
        let config = TransitionConfig::default().with_retry_delay(Duration::ZERO);
        assert_eq!(config.validate(), Err(TransitionError::ZeroRetryDelay));

        let config = TransitionConfig::default().with_storage_up_states(UpStates::new([]));
        assert_eq!(config.validate(), Err(TransitionError::NoUpStates));
    }

    #[test]
    fn from_json() {
        let json = r#"{"storage_up_states": ["up", "retired"], "request_priority": "low"}"#;
        let config: TransitionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
        assert!(config.storage_up_states.contains(NodeState::Retired));
        assert!(!config.storage_up_states.contains(NodeState::Initializing));
        assert_eq!(config.request_priority, Priority::Low);

        let json = serde_json::to_string(&TransitionConfig::default()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"retry_delay_ms":100,"storage_up_states":["up","initializing"],"#,
                r#""request_priority":"high"}"#
            )
        );
    }
}
