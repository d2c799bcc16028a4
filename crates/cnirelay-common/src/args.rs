//! Parsing of the `CNI_ARGS` string into ordered key/value pairs.

use crate::error::{RelayError, RelayResult};

/// Parse a `CNI_ARGS` string into ordered `(key, value)` pairs.
///
/// The string is split on `;` into pairs and each pair is split once on
/// `=`. A pair with an empty key or empty value rejects the whole string;
/// there is no partial-parse tolerance. The empty string parses to an
/// empty list.
///
/// # Errors
///
/// Returns [`RelayError::InvalidArgsPair`] naming the first malformed pair.
pub fn parse_cni_args(raw: &str) -> RelayResult<Vec<(String, String)>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    raw.split(';')
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| invalid(pair))?;
            if key.is_empty() || value.is_empty() {
                return Err(invalid(pair));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn invalid(pair: &str) -> RelayError {
    RelayError::InvalidArgsPair {
        pair: pair.to_string(),
    }
}

/// Render parsed pairs back into the `KEY=value;KEY2=value2` form used by
/// the CNI exec protocol.
#[must_use]
pub fn format_cni_args(args: &[(String, String)]) -> String {
    args.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}
