//! Capability-argument modeling.
//!
//! Capability arguments arrive as JSON from the environment (`CAP_ARGS`),
//! cross the relay boundary as a typed message, and are re-flattened to
//! untyped key/value data only at the translation boundary, because the
//! plugin chain expects them as loose `runtimeConfig` JSON rather than as
//! the modeled type. Port mappings are the only capability modeled today.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Transport protocol for a port mapping.
///
/// Serializes as the lowercase name; accepts any casing when read back,
/// the same rule [`Protocol::parse`] applies on the wire path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP protocol.
    Tcp,
    /// UDP protocol.
    Udp,
}

impl Protocol {
    /// The lowercase protocol name used on the wire and in plugin configs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    /// Parse a protocol name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidCapabilityArgs`] for anything other
    /// than `tcp` or `udp`.
    pub fn parse(name: &str) -> RelayResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(RelayError::InvalidCapabilityArgs {
                message: format!("unknown protocol {other:?}"),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Protocol::parse(&name).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single host-to-container port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    #[serde(rename = "hostPort")]
    pub host_port: u16,
    /// Port inside the container.
    #[serde(rename = "containerPort")]
    pub container_port: u16,
    /// Protocol (tcp or udp).
    pub protocol: Protocol,
    /// Host IP to bind to, if restricted.
    #[serde(rename = "hostIP", default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
}

/// Capability arguments for one command invocation.
///
/// Absent capabilities are represented as empty collections, never null,
/// and the value must survive the relay boundary losslessly: what the
/// client reads from the environment is exactly what the daemon flattens
/// for the plugin chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityArgs {
    /// Ordered port mappings requested for this attachment.
    #[serde(
        rename = "portMappings",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub port_mappings: Vec<PortMapping>,
}

impl CapabilityArgs {
    /// Parse capability arguments from their JSON source text.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidCapabilityArgs`] if the text is not a
    /// valid capability object. Callers fail fast on this before any
    /// network call is made.
    pub fn parse(json: &str) -> RelayResult<Self> {
        serde_json::from_str(json).map_err(|err| RelayError::InvalidCapabilityArgs {
            message: err.to_string(),
        })
    }

    /// Whether no capabilities are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.port_mappings.is_empty()
    }

    /// Re-flatten to the untyped capability map the plugin chain expects.
    ///
    /// This is the single escape hatch from the typed model to loose
    /// JSON; an empty model yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Serialization`] if the value cannot be
    /// re-expressed as JSON, which would indicate a bug in the model.
    pub fn to_untyped(&self) -> RelayResult<HashMap<String, serde_json::Value>> {
        if self.is_empty() {
            return Ok(HashMap::new());
        }
        let value = serde_json::to_value(self)?;
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(RelayError::Serialization(format!(
                "capability arguments flattened to non-object {other}"
            ))),
        }
    }
}
