//! Deterministic container-identity derivation.

use sha2::{Digest, Sha512};

/// Prefix tag on every derived container identity.
pub const CONTAINER_ID_PREFIX: &str = "cnitool-";

/// Derive a container identity from a normalized namespace path.
///
/// The identity is `"cnitool-"` followed by the hex encoding of the first
/// 10 bytes of the SHA-512 digest of the path's UTF-8 bytes. The caller
/// does not supply an identity explicitly, so this must be a pure function
/// of the path: repeated ADD/CHECK/DEL on the same namespace refer to the
/// same logical container across independent calls and server restarts.
///
/// The input must already be the absolute, normalized form of the path;
/// hashing a relative spelling would yield a different identity.
#[must_use]
pub fn derive_container_id(netns: &str) -> String {
    let digest = Sha512::digest(netns.as_bytes());
    format!("{}{}", CONTAINER_ID_PREFIX, hex::encode(&digest[..10]))
}
