//! Conversion settings shared by the load and save pipelines.

use serde::{Deserialize, Serialize};

/// Default document metadata key holding the original container bytes.
pub const RAW_DATA_KEY: &str = "DMI_RawData";

/// Default layer metadata key holding the originating state name.
pub const STATE_NAME_KEY: &str = "DMI_StateName";

/// Settings for [`load_document_with`](crate::load_document_with) and
/// [`save_document`](crate::save_document).
///
/// Every field has a default, so a host may deserialize a partial object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Document metadata key for the base64 original container bytes.
    pub raw_data_key: String,
    /// Layer metadata key for the originating state name.
    pub state_name_key: String,
    /// Always rebuild the container from layers, even when the original
    /// bytes are available.
    pub force_synthesize: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            raw_data_key: RAW_DATA_KEY.to_string(),
            state_name_key: STATE_NAME_KEY.to_string(),
            force_synthesize: false,
        }
    }
}

impl ConvertConfig {
    /// Create a config with the default metadata keys.
    pub fn new() -> Self {
        Self::default()
    }
}
