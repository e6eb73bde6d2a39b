// Coordination configuration
// Settings shared by the election/lock engine and the service registry

use std::time::Duration;

use serde::{Deserialize, Serialize};
use turnstile_common::{
    CommonError, DEFAULT_REGISTRY_ROOT, DEFAULT_SEQUENCE_PREFIX, PATH_SEPARATOR, normalize_path,
};

/// Configuration for the coordination recipes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Prefix of contender node names (default: "lock-")
    /// The store appends a zero-padded sequence to it
    pub sequence_prefix: String,

    /// Default campaign timeout in milliseconds (default: 10000ms)
    pub campaign_timeout_ms: u64,

    /// Session timeout requested from the coordination service (default: 30000ms)
    pub session_timeout_ms: u64,

    /// Root under which service instances are registered (default: "/services")
    pub registry_root: String,

    /// Identity written into contender nodes; empty means "<local ip>#<session id>"
    pub identity: String,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            sequence_prefix: DEFAULT_SEQUENCE_PREFIX.to_string(),
            campaign_timeout_ms: 10_000,
            session_timeout_ms: 30_000,
            registry_root: DEFAULT_REGISTRY_ROOT.to_string(),
            identity: String::new(),
        }
    }
}

impl CoordinationConfig {
    /// Get campaign timeout as Duration
    pub fn campaign_timeout(&self) -> Duration {
        Duration::from_millis(self.campaign_timeout_ms)
    }

    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Reject settings the recipes cannot work with
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.sequence_prefix.contains(PATH_SEPARATOR) {
            return Err(CommonError::InvalidComponent(
                self.sequence_prefix.clone(),
                self.sequence_prefix.clone(),
            ));
        }
        normalize_path(&self.registry_root)?;
        Ok(())
    }
}
