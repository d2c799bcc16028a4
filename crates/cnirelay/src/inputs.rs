//! Assembly of per-invocation inputs from positional arguments and the
//! environment.

use std::path::Path;

use cnirelay_common::{CapabilityArgs, RelayError, RelayResult, netconf};

/// Everything one relay call needs, validated and ready to serialize.
#[derive(Debug, Clone)]
pub struct CommandInputs {
    /// Serialized configuration list (the opaque blob).
    pub conf: String,
    /// Namespace path as supplied by the caller.
    pub netns: String,
    /// Interface name, already defaulted.
    pub if_name: String,
    /// Raw `CNI_ARGS` string, passed through unparsed.
    pub cni_args: String,
    /// Parsed capability arguments.
    pub cap_args: CapabilityArgs,
}

/// Build the inputs for one command invocation.
///
/// The capability JSON is parsed here so a malformed value fails fast,
/// before any network call is made. The configuration list is loaded by
/// name from `netconf_dir` and re-serialized to the opaque blob the wire
/// schema carries.
///
/// # Errors
///
/// Fails on an empty network name or namespace path, a missing
/// configuration list, or malformed capability JSON.
pub fn build(
    name: &str,
    netns: &str,
    netconf_dir: &Path,
    cap_args_json: Option<&str>,
    cni_args: Option<&str>,
    if_name: Option<&str>,
) -> RelayResult<CommandInputs> {
    if name.is_empty() {
        return Err(RelayError::NetConfNotFound {
            name: String::new(),
            dir: netconf_dir.display().to_string(),
        });
    }
    if netns.is_empty() {
        return Err(RelayError::NetnsRequired);
    }

    let cap_args = match cap_args_json {
        Some(json) if !json.is_empty() => CapabilityArgs::parse(json)?,
        _ => CapabilityArgs::default(),
    };

    let list = netconf::load_conf_list(netconf_dir, name)?;
    let conf = list.to_blob()?;

    let if_name = match if_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => cnirelay_common::env::DEFAULT_IFNAME.to_string(),
    };

    Ok(CommandInputs {
        conf,
        netns: netns.to_string(),
        if_name,
        cni_args: cni_args.unwrap_or_default().to_string(),
        cap_args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MYNET: &str = r#"{
        "cniVersion": "1.0.0",
        "name": "mynet",
        "plugins": [{"type": "bridge"}]
    }"#;

    fn conf_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("10-mynet.conflist"), MYNET).unwrap();
        dir
    }

    #[test]
    fn defaults_when_env_is_unset() {
        let dir = conf_dir();
        let inputs = build("mynet", "/var/run/netns/ns1", dir.path(), None, None, None).unwrap();
        assert_eq!(inputs.if_name, "eth0");
        assert!(inputs.cni_args.is_empty());
        assert!(inputs.cap_args.is_empty());
        assert!(inputs.conf.contains("\"mynet\""));
    }

    #[test]
    fn malformed_cap_args_fail_before_any_call() {
        let dir = conf_dir();
        let err = build(
            "mynet",
            "/var/run/netns/ns1",
            dir.path(),
            Some("{bad"),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::InvalidCapabilityArgs { .. }));
    }

    #[test]
    fn empty_name_and_netns_are_rejected() {
        let dir = conf_dir();
        assert!(build("", "/var/run/netns/ns1", dir.path(), None, None, None).is_err());
        assert!(matches!(
            build("mynet", "", dir.path(), None, None, None).unwrap_err(),
            RelayError::NetnsRequired
        ));
    }

    #[test]
    fn unknown_network_is_not_found() {
        let dir = conf_dir();
        let err = build("nosuchnet", "/ns", dir.path(), None, None, None).unwrap_err();
        assert!(matches!(err, RelayError::NetConfNotFound { .. }));
    }

    #[test]
    fn env_values_are_carried_through() {
        let dir = conf_dir();
        let inputs = build(
            "mynet",
            "/var/run/netns/ns1",
            dir.path(),
            Some(r#"{"portMappings": [{"hostPort": 80, "containerPort": 80, "protocol": "tcp"}]}"#),
            Some("K8S_POD_NAME=web"),
            Some("net1"),
        )
        .unwrap();
        assert_eq!(inputs.if_name, "net1");
        assert_eq!(inputs.cni_args, "K8S_POD_NAME=web");
        assert_eq!(inputs.cap_args.port_mappings.len(), 1);
    }
}
