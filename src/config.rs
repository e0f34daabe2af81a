use serde::{Deserialize, Serialize};

const DEFAULT_MAX_CALL_DEPTH: usize = 512;
const DEFAULT_MAX_STACK: usize = 4096;

/// Per-session loader settings.
///
/// Every field has a default, so a partial JSON document such as
/// `{"max_call_depth": 64}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Reject payloads whose SHA-256 trailer does not match their body.
    pub verify_checksum: bool,
    /// Deepest nesting of interpreted calls before execution fails.
    pub max_call_depth: usize,
    /// Operand stack slots available to a single interpreted call.
    pub max_stack: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack: DEFAULT_MAX_STACK,
        }
    }
}

impl LoaderConfig {
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
