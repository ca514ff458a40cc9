//! Bridge configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::wire::{FaultFormat, GlobalFunctionId};

/// Settings shared by every bridge attached to one [`crate::BridgeContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How the remote endpoint spells its error sentinel.
    pub fault: FaultFormat,
    /// Cap on local callables registered per bridge. Values above the
    /// 16-bit sequence space are clamped.
    pub max_local_functions: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fault: FaultFormat::default(),
            max_local_functions: GlobalFunctionId::SEQUENCE_SPACE,
        }
    }
}

impl BridgeConfig {
    pub fn with_fault_format(mut self, fault: FaultFormat) -> Self {
        self.fault = fault;
        self
    }

    pub fn local_function_limit(&self) -> u32 {
        self.max_local_functions.min(GlobalFunctionId::SEQUENCE_SPACE)
    }

    pub fn from_json(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(r#"{"fault": {"sentinel": "__FLASHERROR"}}"#).unwrap();
        assert_eq!(config.fault.sentinel, "__FLASHERROR");
        assert_eq!(config.fault.delimiter, "||");
        assert_eq!(config.max_local_functions, 65536);
    }

    #[test]
    fn limit_is_clamped_to_sequence_space() {
        let config = BridgeConfig {
            max_local_functions: 1_000_000,
            ..BridgeConfig::default()
        };
        assert_eq!(config.local_function_limit(), 65536);
    }
}
