use serde::{Deserialize, Serialize};

use crate::scim::DecodeOptions;

/// Payload decoding settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecodeConfig {
    /// Skip keys that name no declared attribute instead of rejecting the
    /// payload with `invalidSyntax`. Default: false.
    #[serde(default)]
    pub ignore_unknown_attributes: bool,
}

impl DecodeConfig {
    pub fn options(&self) -> DecodeOptions {
        DecodeOptions {
            ignore_unknown_attributes: self.ignore_unknown_attributes,
        }
    }
}

impl From<&DecodeConfig> for DecodeOptions {
    fn from(config: &DecodeConfig) -> Self {
        config.options()
    }
}
