//! Network-configuration-list loading and pass-through.
//!
//! The relay treats a configuration list as an opaque serialized blob:
//! the client loads it by name, serializes it, and the daemon only
//! deserializes it again at the translation boundary immediately before
//! delegation. Plugin entries stay raw JSON so nothing is lost in transit.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// An ordered list of plugin configurations identified by a network name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfigList {
    /// CNI specification version the list was written against.
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    /// The network name the list is looked up by.
    pub name: String,
    /// Plugin configurations in chain order, kept as raw JSON.
    #[serde(default)]
    pub plugins: Vec<serde_json::Value>,
    /// Fields this layer does not interpret, preserved for pass-through.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NetworkConfigList {
    /// Deserialize a list from its opaque serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidNetworkConfig`] if the blob is not a
    /// valid configuration list.
    pub fn from_blob(blob: &str) -> RelayResult<Self> {
        serde_json::from_str(blob).map_err(|err| RelayError::InvalidNetworkConfig {
            message: err.to_string(),
        })
    }

    /// Serialize the list to the opaque form carried across the relay.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Serialization`] on failure.
    pub fn to_blob(&self) -> RelayResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Load the configuration list named `name` from a directory.
///
/// Scans `*.conflist` files in sorted order and returns the first list
/// whose `name` field matches. Files that fail to parse are skipped with
/// a warning rather than aborting the search.
///
/// # Errors
///
/// Returns [`RelayError::NetConfNotFound`] when no file matches, or an
/// I/O error if the directory cannot be read.
pub fn load_conf_list(dir: &Path, name: &str) -> RelayResult<NetworkConfigList> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "conflist"))
        .collect();
    entries.sort();

    for path in entries {
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<NetworkConfigList>(&content) {
            Ok(list) if list.name == name => return Ok(list),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "skipping unparseable conflist");
            }
        }
    }

    Err(RelayError::NetConfNotFound {
        name: name.to_string(),
        dir: dir.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MYNET: &str = r#"{
        "cniVersion": "1.0.0",
        "name": "mynet",
        "plugins": [
            {"type": "bridge", "bridge": "cni0", "ipam": {"type": "host-local", "subnet": "10.10.0.0/16"}},
            {"type": "portmap", "capabilities": {"portMappings": true}}
        ]
    }"#;

    #[test]
    fn loads_matching_list() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("10-mynet.conflist"), MYNET).unwrap();
        std::fs::write(dir.path().join("99-other.conflist"), r#"{"name": "other"}"#).unwrap();

        let list = load_conf_list(dir.path(), "mynet").unwrap();
        assert_eq!(list.name, "mynet");
        assert_eq!(list.plugins.len(), 2);
        assert_eq!(list.plugins[0]["type"], "bridge");
    }

    #[test]
    fn missing_name_is_not_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("10-mynet.conflist"), MYNET).unwrap();

        let err = load_conf_list(dir.path(), "nosuchnet").unwrap_err();
        assert!(matches!(err, RelayError::NetConfNotFound { name, .. } if name == "nosuchnet"));
    }

    #[test]
    fn ignores_non_conflist_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mynet.conf"), MYNET).unwrap();

        assert!(load_conf_list(dir.path(), "mynet").is_err());
    }

    #[test]
    fn blob_round_trip_preserves_plugins() {
        let list = NetworkConfigList::from_blob(MYNET).unwrap();
        let blob = list.to_blob().unwrap();
        let back = NetworkConfigList::from_blob(&blob).unwrap();
        assert_eq!(back, list);
        assert_eq!(back.plugins[1]["capabilities"]["portMappings"], true);
    }
}
