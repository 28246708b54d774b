//! Store configuration.

use serde::Deserialize;

fn default_max_eval_depth() -> usize {
    512
}

fn default_skip_equal_writes() -> bool {
    true
}

/// Tunables for a [`Store`](super::Store).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust,ignore
/// let config = StoreConfig::from_json(r#"{"max_eval_depth": 64}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum nesting of computed-atom evaluations. A chain of N layers
    /// needs a depth of at least N.
    #[serde(default = "default_max_eval_depth")]
    pub max_eval_depth: usize,

    /// Ignore writes to a primitive atom that would store an equal value.
    #[serde(default = "default_skip_equal_writes")]
    pub skip_equal_writes: bool,
}

impl StoreConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_eval_depth: default_max_eval_depth(),
            skip_equal_writes: default_skip_equal_writes(),
        }
    }
}
