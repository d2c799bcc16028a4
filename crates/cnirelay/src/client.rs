//! The relay client: one persistent channel, one rpc per invocation.

use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tonic::Request;
use tonic::transport::Channel;

use cnirelay_proto::v1::cni_relay_client::CniRelayClient;
use cnirelay_proto::v1::{AddRequest, CheckRequest, DelRequest};

use crate::inputs::CommandInputs;

/// Client for the relay service.
pub struct RelayClient {
    inner: CniRelayClient<Channel>,
    timeout: Option<Duration>,
}

impl RelayClient {
    /// Connect to the relay daemon.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint is invalid or the connection is refused.
    pub async fn connect(endpoint: String, timeout: Option<Duration>) -> Result<Self> {
        let channel = Channel::from_shared(endpoint.clone())
            .wrap_err_with(|| format!("invalid endpoint {endpoint}"))?
            .connect()
            .await
            .wrap_err_with(|| format!("failed to connect to {endpoint}"))?;
        Ok(Self {
            inner: CniRelayClient::new(channel),
            timeout,
        })
    }

    /// Relay an ADD command; returns the chain's textual result.
    ///
    /// # Errors
    ///
    /// Surfaces the rpc error verbatim; there is no retry.
    pub async fn add(&mut self, inputs: &CommandInputs) -> Result<String> {
        let mut request = Request::new(AddRequest {
            conf: inputs.conf.clone(),
            netns: inputs.netns.clone(),
            if_name: inputs.if_name.clone(),
            cni_args: inputs.cni_args.clone(),
            cap_args: Some(inputs.cap_args.clone().into()),
        });
        self.apply_timeout(&mut request);

        let response = self.inner.add(request).await.wrap_err("add failed")?;
        Ok(response.into_inner().stdout)
    }

    /// Relay a CHECK command.
    ///
    /// # Errors
    ///
    /// Surfaces the rpc error verbatim; there is no retry.
    pub async fn check(&mut self, inputs: &CommandInputs) -> Result<()> {
        let mut request = Request::new(CheckRequest {
            conf: inputs.conf.clone(),
            netns: inputs.netns.clone(),
            if_name: inputs.if_name.clone(),
            cni_args: inputs.cni_args.clone(),
            cap_args: Some(inputs.cap_args.clone().into()),
        });
        self.apply_timeout(&mut request);

        let response = self.inner.check(request).await.wrap_err("check failed")?;
        let error = response.into_inner().error;
        if !error.is_empty() {
            color_eyre::eyre::bail!("check failed: {error}");
        }
        Ok(())
    }

    /// Relay a DEL command.
    ///
    /// # Errors
    ///
    /// Surfaces the rpc error verbatim; there is no retry.
    pub async fn del(&mut self, inputs: &CommandInputs) -> Result<()> {
        let mut request = Request::new(DelRequest {
            conf: inputs.conf.clone(),
            netns: inputs.netns.clone(),
            if_name: inputs.if_name.clone(),
            cni_args: inputs.cni_args.clone(),
            cap_args: Some(inputs.cap_args.clone().into()),
        });
        self.apply_timeout(&mut request);

        let response = self.inner.del(request).await.wrap_err("del failed")?;
        let error = response.into_inner().error;
        if !error.is_empty() {
            color_eyre::eyre::bail!("del failed: {error}");
        }
        Ok(())
    }

    // The deadline rides the grpc-timeout header; the daemon passes it
    // through but the plugin chain may ignore interruption mid-run.
    fn apply_timeout<T>(&self, request: &mut Request<T>) {
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
    }
}
