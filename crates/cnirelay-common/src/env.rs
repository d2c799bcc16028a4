//! Environment variable names and defaults shared by the client and daemon.

/// Colon-separated list of directories searched for plugin binaries.
pub const ENV_CNI_PATH: &str = "CNI_PATH";

/// Directory holding network configuration lists.
pub const ENV_NETCONF_DIR: &str = "NETCONFPATH";

/// JSON blob of capability arguments for the current invocation.
pub const ENV_CAP_ARGS: &str = "CAP_ARGS";

/// Semicolon-separated `KEY=value` argument string.
pub const ENV_CNI_ARGS: &str = "CNI_ARGS";

/// Interface name to create inside the namespace.
pub const ENV_IFNAME: &str = "CNI_IFNAME";

/// Default configuration directory when `NETCONFPATH` is unset.
pub const DEFAULT_NETCONF_DIR: &str = "/etc/cni/net.d";

/// Default interface name when `CNI_IFNAME` is unset or empty.
pub const DEFAULT_IFNAME: &str = "eth0";

/// Plugin search paths from `CNI_PATH`, split on `:`.
///
/// An unset or empty variable yields an empty list; empty entries are
/// skipped so `"/opt/cni/bin:"` does not produce a bogus `""` path.
#[must_use]
pub fn plugin_search_paths() -> Vec<std::path::PathBuf> {
    std::env::var(ENV_CNI_PATH)
        .unwrap_or_default()
        .split(':')
        .filter(|p| !p.is_empty())
        .map(std::path::PathBuf::from)
        .collect()
}
