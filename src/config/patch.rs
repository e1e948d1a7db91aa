use serde::{Deserialize, Serialize};

/// PATCH engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchConfig {
    /// Demote previous primary values when an operation sets a new one, and
    /// reject operations that leave several primary values.
    /// Default: true.
    #[serde(default = "default_true")]
    pub enforce_primary: bool,

    /// Fail operations whose path names an unknown attribute or schema.
    /// When false such operations are skipped. Default: true.
    #[serde(default = "default_true")]
    pub strict_paths: bool,

    /// Maximum operations per request. Unlimited when unset.
    #[serde(default)]
    pub max_operations: Option<usize>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            enforce_primary: true,
            strict_paths: true,
            max_operations: None,
        }
    }
}

impl PatchConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.max_operations == Some(0) {
            return Err("patch.max_operations must be greater than 0 (omit it for no limit)".into());
        }
        if !self.enforce_primary {
            tracing::warn!(
                "patch.enforce_primary is disabled. PATCH requests may leave several \
                 primary values in a multi-valued attribute."
            );
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
