//! The plugin-chain invocation seam.
//!
//! The dispatcher talks to the chain through [`ChainInvoker`]:
//! `realize`/`verify`/`teardown`, each synchronous from the caller's
//! point of view and free to block its serving task for the duration of
//! plugin execution. [`ExecInvoker`] is the production implementation
//! and speaks the CNI exec protocol: plugin binary located by `type` on
//! the search path, parameters in `CNI_*` environment variables, the
//! per-plugin configuration on stdin, the result on stdout.
//!
//! Known gap: concurrent calls targeting the same namespace are not
//! coordinated here, and a partially failed ADD is not rolled back.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use cnirelay_common::args::format_cni_args;
use cnirelay_common::{NetworkConfigList, RelayError, RelayResult};

use crate::translate::RuntimeConf;

/// Executes a configuration list against a runtime configuration.
#[async_trait]
pub trait ChainInvoker: Send + Sync {
    /// Realize the configuration list (ADD). Returns the chain's final
    /// textual result.
    async fn realize(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<String>;

    /// Verify the configuration list's live state (CHECK).
    async fn verify(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()>;

    /// Tear the configuration list down (DEL).
    async fn teardown(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()>;
}

/// Invoker that executes plugin binaries found on the search path.
#[derive(Debug, Clone)]
pub struct ExecInvoker {
    search_paths: Vec<PathBuf>,
}

impl ExecInvoker {
    /// Create an invoker with explicit plugin search paths.
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Create an invoker with search paths from `CNI_PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(cnirelay_common::env::plugin_search_paths())
    }

    fn find_plugin(&self, kind: &str) -> RelayResult<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(kind))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| RelayError::PluginNotFound {
                plugin: kind.to_string(),
            })
    }

    fn search_path_env(&self) -> String {
        self.search_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }

    async fn exec_plugin(
        &self,
        command: &str,
        kind: &str,
        conf: &[u8],
        rt: &RuntimeConf,
    ) -> RelayResult<Vec<u8>> {
        let binary = self.find_plugin(kind)?;
        tracing::debug!(
            plugin = kind,
            command,
            container_id = %rt.container_id,
            "executing plugin"
        );

        let mut cmd = tokio::process::Command::new(&binary);
        cmd.env("CNI_COMMAND", command)
            .env("CNI_CONTAINERID", &rt.container_id)
            .env("CNI_NETNS", &rt.netns)
            .env("CNI_IFNAME", &rt.if_name)
            .env("CNI_PATH", self.search_path_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !rt.args.is_empty() {
            cmd.env("CNI_ARGS", format_cni_args(&rt.args));
        }

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(conf).await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(RelayError::PluginFailed {
                plugin: kind.to_string(),
                message: plugin_error_text(&output.stdout, &output.stderr),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl ChainInvoker for ExecInvoker {
    async fn realize(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<String> {
        if list.plugins.is_empty() {
            return Err(RelayError::InvalidNetworkConfig {
                message: format!("configuration list {:?} has no plugins", list.name),
            });
        }

        let mut prev_result: Option<Value> = None;

        for plugin in &list.plugins {
            let kind = plugin_kind(plugin)?;
            let conf = plugin_conf(list, plugin, rt, prev_result.as_ref())?;
            let stdout = self.exec_plugin("ADD", kind, &conf, rt).await?;
            prev_result = Some(serde_json::from_slice(&stdout).map_err(|err| {
                RelayError::PluginFailed {
                    plugin: kind.to_string(),
                    message: format!("unparseable result: {err}"),
                }
            })?);
        }

        let result = prev_result.unwrap_or(Value::Null);
        Ok(serde_json::to_string(&result)?)
    }

    async fn verify(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()> {
        for plugin in &list.plugins {
            let kind = plugin_kind(plugin)?;
            let conf = plugin_conf(list, plugin, rt, None)?;
            self.exec_plugin("CHECK", kind, &conf, rt).await?;
        }
        Ok(())
    }

    async fn teardown(&self, list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()> {
        // Plugins are torn down in reverse chain order.
        for plugin in list.plugins.iter().rev() {
            let kind = plugin_kind(plugin)?;
            let conf = plugin_conf(list, plugin, rt, None)?;
            self.exec_plugin("DEL", kind, &conf, rt).await?;
        }
        Ok(())
    }
}

fn plugin_kind(plugin: &Value) -> RelayResult<&str> {
    plugin
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::InvalidNetworkConfig {
            message: "plugin entry has no type".to_string(),
        })
}

/// Build the per-plugin configuration: the raw plugin entry with the
/// list's `name` and `cniVersion` injected, `runtimeConfig` for the
/// capabilities the plugin declares, and the previous plugin's result
/// when chaining.
fn plugin_conf(
    list: &NetworkConfigList,
    plugin: &Value,
    rt: &RuntimeConf,
    prev_result: Option<&Value>,
) -> RelayResult<Vec<u8>> {
    let mut conf = plugin.clone();
    let declared = plugin
        .get("capabilities")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let obj = conf
        .as_object_mut()
        .ok_or_else(|| RelayError::InvalidNetworkConfig {
            message: "plugin entry is not an object".to_string(),
        })?;
    obj.insert("name".to_string(), Value::String(list.name.clone()));
    obj.insert(
        "cniVersion".to_string(),
        Value::String(list.cni_version.clone()),
    );

    let mut runtime = serde_json::Map::new();
    for (capability, value) in &rt.capability_args {
        if declared.get(capability).and_then(Value::as_bool) == Some(true) {
            runtime.insert(capability.clone(), value.clone());
        }
    }
    if !runtime.is_empty() {
        obj.insert("runtimeConfig".to_string(), Value::Object(runtime));
    }

    if let Some(prev) = prev_result {
        obj.insert("prevResult".to_string(), prev.clone());
    }

    Ok(serde_json::to_vec(&conf)?)
}

/// Prefer the plugin's structured error message, fall back to stderr.
fn plugin_error_text(stdout: &[u8], stderr: &[u8]) -> String {
    if let Ok(err) = serde_json::from_slice::<Value>(stdout) {
        if let Some(msg) = err.get("msg").and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    String::from_utf8_lossy(stderr).trim().to_string()
}
