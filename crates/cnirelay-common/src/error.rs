//! Common error types for the cnirelay crates.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`RelayError`].
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors shared across the relay client and daemon.
#[derive(Error, Diagnostic, Debug)]
pub enum RelayError {
    /// The network namespace path was empty.
    #[error("network namespace path is required")]
    #[diagnostic(
        code(cnirelay::netns_required),
        help("Pass the namespace path as the last positional argument, e.g. /var/run/netns/ns1")
    )]
    NetnsRequired,

    /// A `CNI_ARGS` pair was malformed.
    #[error("invalid CNI_ARGS pair {pair:?}")]
    #[diagnostic(
        code(cnirelay::invalid_args),
        help("CNI_ARGS must look like KEY=value;KEY2=value2 with no empty keys or values")
    )]
    InvalidArgsPair {
        /// The offending pair as it appeared in the input.
        pair: String,
    },

    /// Capability-argument JSON did not parse.
    #[error("invalid capability arguments: {message}")]
    #[diagnostic(
        code(cnirelay::invalid_cap_args),
        help("CAP_ARGS must be a JSON object, e.g. {{\"portMappings\": [...]}}")
    )]
    InvalidCapabilityArgs {
        /// Why the value was rejected.
        message: String,
    },

    /// The serialized network configuration list did not parse.
    #[error("invalid network configuration list: {message}")]
    #[diagnostic(code(cnirelay::invalid_netconf))]
    InvalidNetworkConfig {
        /// Why the blob was rejected.
        message: String,
    },

    /// No configuration list with the requested name was found.
    #[error("network configuration {name:?} not found in {dir}")]
    #[diagnostic(
        code(cnirelay::netconf_not_found),
        help("Set NETCONFPATH to the directory holding your .conflist files")
    )]
    NetConfNotFound {
        /// The requested network name.
        name: String,
        /// The directory that was searched.
        dir: String,
    },

    /// A plugin binary could not be located on the search path.
    #[error("plugin {plugin:?} not found on CNI_PATH")]
    #[diagnostic(code(cnirelay::plugin_not_found))]
    PluginNotFound {
        /// The plugin type that was looked up.
        plugin: String,
    },

    /// A plugin reported failure.
    #[error("plugin {plugin} failed: {message}")]
    #[diagnostic(code(cnirelay::plugin_failed))]
    PluginFailed {
        /// The plugin type that failed.
        plugin: String,
        /// The plugin's error text.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(cnirelay::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    #[diagnostic(code(cnirelay::serialization))]
    Serialization(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}
