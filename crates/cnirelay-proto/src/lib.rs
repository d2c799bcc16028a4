//! # cnirelay-proto
//!
//! Generated gRPC types for the relay protocol, plus conversions between
//! the generated messages and the modeled types in `cnirelay-common`.

#![allow(missing_docs)]

/// Generated protobuf/tonic code for `cnirelay.v1`.
pub mod v1 {
    tonic::include_proto!("cnirelay.v1");
}

mod convert;
