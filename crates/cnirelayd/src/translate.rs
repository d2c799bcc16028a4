//! Translation from raw request fields into a runtime configuration.
//!
//! This is the one nontrivial step between the wire and the plugin chain:
//! validate the namespace path, normalize it, derive the container
//! identity from it, parse the argument string, and flatten the
//! capability arguments. The configuration-list blob is only
//! deserialized here, immediately before delegation.

use std::collections::HashMap;
use std::path::PathBuf;

use cnirelay_common::env::DEFAULT_IFNAME;
use cnirelay_common::{
    CapabilityArgs, NetworkConfigList, RelayError, RelayResult, derive_container_id,
    parse_cni_args,
};

/// Per-invocation parameters handed to the plugin chain.
///
/// Created fresh per request and owned by that request's processing
/// lifetime; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConf {
    /// Identity derived from the normalized namespace path.
    pub container_id: String,
    /// Absolute path to the namespace handle.
    pub netns: PathBuf,
    /// Interface name inside the namespace.
    pub if_name: String,
    /// Ordered `CNI_ARGS` key/value pairs.
    pub args: Vec<(String, String)>,
    /// Capability arguments, re-expressed as untyped key/value data.
    pub capability_args: HashMap<String, serde_json::Value>,
}

/// Build the runtime configuration and deserialized configuration list
/// for one request.
///
/// # Errors
///
/// Fails before any delegate call on an empty namespace path, a
/// namespace path that cannot be resolved to an absolute path, a
/// malformed argument string, or an unparseable configuration blob.
pub fn translate(
    conf: &str,
    netns: &str,
    if_name: &str,
    cni_args: &str,
    caps: &CapabilityArgs,
) -> RelayResult<(NetworkConfigList, RuntimeConf)> {
    if netns.is_empty() {
        return Err(RelayError::NetnsRequired);
    }

    let list = NetworkConfigList::from_blob(conf)?;

    let netns = std::path::absolute(netns)?;
    let container_id = derive_container_id(&netns.to_string_lossy());

    let if_name = if if_name.is_empty() {
        DEFAULT_IFNAME.to_string()
    } else {
        if_name.to_string()
    };

    let rt = RuntimeConf {
        container_id,
        netns,
        if_name,
        args: parse_cni_args(cni_args)?,
        capability_args: caps.to_untyped()?,
    };

    Ok((list, rt))
}
