use serde::{Deserialize, Serialize};

use crate::sync::FLUSH_QUANTUM_MS;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    /// Debounce quantum for remote preference flushes, in milliseconds.
    pub quantum_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            quantum_ms: FLUSH_QUANTUM_MS,
        }
    }
}
