use crate::utils::validation::validate_port_range;
use anyhow::{Result, anyhow, bail};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// One tenant's routing target.
///
/// A `HostConfig` is never an error: a host without a usable configuration document is
/// represented by [`HostConfig::invalid`] so the failure can be cached like any other result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostConfig {
    pub port: u16,
    pub local_port: Option<u16>,
    pub valid: bool,
}

// Shape of `<sites_root>/<hostname>/config.yml`. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct HostConfigDocument {
    port: u16,
    #[serde(rename = "local-port", deserialize_with = "u16_option_or_default", default)]
    local_port: Option<u16>,
    #[serde(deserialize_with = "bool_or_default", default)]
    error: bool,
}

impl HostConfig {
    pub fn new(port: u16, local_port: Option<u16>) -> Self {
        Self { port, local_port, valid: true }
    }

    pub fn invalid() -> Self {
        Self { port: 0, local_port: None, valid: false }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The port requests are forwarded to; `local-port` wins over `port` when set.
    pub fn target_port(&self) -> u16 {
        self.local_port.unwrap_or(self.port)
    }

    /// Parse a host configuration document.
    pub fn parse(content: &str) -> Result<Self> {
        // Go through a Value so a malformed optional field cannot derail the rest of the document
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if value.is_null() {
            bail!("Host config document is empty");
        }
        let document: HostConfigDocument = serde_yaml::from_value(value)?;
        if document.error {
            bail!("Host config is marked as errored");
        }
        validate_port_range(document.port).map_err(|e| anyhow!(e))?;
        Ok(Self::new(document.port, document.local_port))
    }
}

// Forgiving bool: non-bool types fall back to false.
fn bool_or_default<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match bool::deserialize(deserializer) {
        Ok(b) => Ok(b),
        Err(e) => {
            warn!("Failed to deserialize bool value: {}, using false", e);
            Ok(false)
        }
    }
}

// A zero, null or non-integer `local-port` means the override is not set.
fn u16_option_or_default<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u16>::deserialize(deserializer) {
        Ok(Some(n)) if n > u16::MIN => Ok(Some(n)),
        Ok(_) => Ok(None),
        Err(e) => {
            warn!("Failed to deserialize local-port value: {}, ignoring it", e);
            Ok(None)
        }
    }
}
