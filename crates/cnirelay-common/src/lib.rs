//! # cnirelay-common
//!
//! Shared types for the cnirelay relay protocol.
//!
//! This crate provides the pieces both the client and the daemon need:
//! - Capability-argument modeling (port mappings)
//! - `CNI_ARGS` string parsing
//! - Deterministic container-identity derivation
//! - Network-configuration-list loading
//! - Environment variable names and defaults
//! - Common error types

#![warn(missing_docs)]

pub mod args;
pub mod caps;
pub mod env;
pub mod error;
pub mod id;
pub mod netconf;

pub use args::parse_cni_args;
pub use caps::{CapabilityArgs, PortMapping, Protocol};
pub use error::{RelayError, RelayResult};
pub use id::derive_container_id;
pub use netconf::NetworkConfigList;
