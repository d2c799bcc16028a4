//! Conversions between wire messages and modeled capability arguments.
//!
//! The wire side is tolerant (absent message means empty, ports are
//! `uint32`), so the wire-to-model direction is fallible while the
//! model-to-wire direction is not.

use cnirelay_common::{CapabilityArgs, PortMapping, Protocol, RelayError};

use crate::v1;

impl From<CapabilityArgs> for v1::CapabilityArgs {
    fn from(caps: CapabilityArgs) -> Self {
        v1::CapabilityArgs {
            port_mappings: caps
                .port_mappings
                .into_iter()
                .map(|m| v1::PortMapping {
                    host_port: u32::from(m.host_port),
                    container_port: u32::from(m.container_port),
                    protocol: m.protocol.as_str().to_string(),
                    host_ip: m.host_ip.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl TryFrom<v1::CapabilityArgs> for CapabilityArgs {
    type Error = RelayError;

    fn try_from(caps: v1::CapabilityArgs) -> Result<Self, Self::Error> {
        let port_mappings = caps
            .port_mappings
            .into_iter()
            .map(|m| {
                let host_port = port(m.host_port)?;
                let container_port = port(m.container_port)?;
                Ok(PortMapping {
                    host_port,
                    container_port,
                    protocol: Protocol::parse(&m.protocol)?,
                    host_ip: if m.host_ip.is_empty() {
                        None
                    } else {
                        Some(m.host_ip)
                    },
                })
            })
            .collect::<Result<Vec<_>, RelayError>>()?;
        Ok(CapabilityArgs { port_mappings })
    }
}

fn port(value: u32) -> Result<u16, RelayError> {
    u16::try_from(value).map_err(|_| RelayError::InvalidCapabilityArgs {
        message: format!("port {value} out of range"),
    })
}
