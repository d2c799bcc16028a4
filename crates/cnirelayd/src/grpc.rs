//! gRPC dispatcher for the three relay operations.
//!
//! The service is stateless: each request is validated, translated into
//! a runtime configuration, delegated to the chain invoker, and mapped
//! to a response. Delegate errors are propagated verbatim with no retry
//! and no compensating action.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use cnirelay_common::{CapabilityArgs, RelayError};
use cnirelay_proto::v1::cni_relay_server::{CniRelay, CniRelayServer};
use cnirelay_proto::v1::{
    AddRequest, AddResponse, CheckRequest, CheckResponse, DelRequest, DelResponse,
};

use crate::invoker::ChainInvoker;
use crate::translate;

/// Relay service implementation shared by both listeners.
#[derive(Clone)]
pub struct CniRelayService {
    invoker: Arc<dyn ChainInvoker>,
}

impl CniRelayService {
    /// Create a service delegating to the given chain invoker.
    pub fn new(invoker: Arc<dyn ChainInvoker>) -> Self {
        Self { invoker }
    }

    /// Wrap the service for registration with a tonic server.
    pub fn into_server(self) -> CniRelayServer<Self> {
        CniRelayServer::new(self)
    }
}

#[tonic::async_trait]
impl CniRelay for CniRelayService {
    async fn add(&self, request: Request<AddRequest>) -> Result<Response<AddResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(
            netns = %req.netns,
            if_name = %req.if_name,
            cni_args = %req.cni_args,
            "add request received"
        );

        let caps = decode_caps(req.cap_args)?;
        let (list, rt) = translate::translate(&req.conf, &req.netns, &req.if_name, &req.cni_args, &caps)
            .map_err(|err| into_status(&err))?;
        tracing::debug!(container_id = %rt.container_id, network = %list.name, "delegating add");

        let stdout = self
            .invoker
            .realize(&list, &rt)
            .await
            .map_err(|err| into_status(&err))?;
        Ok(Response::new(AddResponse { stdout }))
    }

    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(
            netns = %req.netns,
            if_name = %req.if_name,
            cni_args = %req.cni_args,
            "check request received"
        );

        let caps = decode_caps(req.cap_args)?;
        let (list, rt) = translate::translate(&req.conf, &req.netns, &req.if_name, &req.cni_args, &caps)
            .map_err(|err| into_status(&err))?;
        tracing::debug!(container_id = %rt.container_id, network = %list.name, "delegating check");

        self.invoker
            .verify(&list, &rt)
            .await
            .map_err(|err| into_status(&err))?;
        Ok(Response::new(CheckResponse {
            error: String::new(),
        }))
    }

    async fn del(&self, request: Request<DelRequest>) -> Result<Response<DelResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(
            netns = %req.netns,
            if_name = %req.if_name,
            cni_args = %req.cni_args,
            "del request received"
        );

        let caps = decode_caps(req.cap_args)?;
        let (list, rt) = translate::translate(&req.conf, &req.netns, &req.if_name, &req.cni_args, &caps)
            .map_err(|err| into_status(&err))?;
        tracing::debug!(container_id = %rt.container_id, network = %list.name, "delegating del");

        self.invoker
            .teardown(&list, &rt)
            .await
            .map_err(|err| into_status(&err))?;
        Ok(Response::new(DelResponse {
            error: String::new(),
        }))
    }
}

/// Decode the optional capability message; absent means empty.
fn decode_caps(caps: Option<cnirelay_proto::v1::CapabilityArgs>) -> Result<CapabilityArgs, Status> {
    CapabilityArgs::try_from(caps.unwrap_or_default()).map_err(|err| into_status(&err))
}

fn into_status(err: &RelayError) -> Status {
    match err {
        RelayError::NetnsRequired
        | RelayError::InvalidArgsPair { .. }
        | RelayError::InvalidCapabilityArgs { .. }
        | RelayError::InvalidNetworkConfig { .. } => Status::invalid_argument(err.to_string()),
        RelayError::NetConfNotFound { .. } | RelayError::PluginNotFound { .. } => {
            Status::not_found(err.to_string())
        }
        RelayError::PluginFailed { .. } | RelayError::Io(_) | RelayError::Serialization(_) => {
            Status::internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cnirelay_common::{NetworkConfigList, RelayResult, derive_container_id};

    use crate::translate::RuntimeConf;

    const CONF: &str = r#"{
        "cniVersion": "1.0.0",
        "name": "mynet",
        "plugins": [{"type": "bridge"}]
    }"#;

    /// Records every delegate call; optionally fails each one.
    struct RecordingInvoker {
        calls: Mutex<Vec<(&'static str, RuntimeConf)>>,
        failure: Option<String>,
    }

    impl RecordingInvoker {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: Some(message.to_string()),
            }
        }

        fn record(&self, op: &'static str, rt: &RuntimeConf) -> RelayResult<()> {
            self.calls.lock().unwrap().push((op, rt.clone()));
            match &self.failure {
                Some(message) => Err(RelayError::PluginFailed {
                    plugin: "bridge".to_string(),
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<(&'static str, RuntimeConf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainInvoker for RecordingInvoker {
        async fn realize(
            &self,
            _list: &NetworkConfigList,
            rt: &RuntimeConf,
        ) -> RelayResult<String> {
            self.record("realize", rt)?;
            Ok(r#"{"cniVersion": "1.0.0", "ips": []}"#.to_string())
        }

        async fn verify(&self, _list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()> {
            self.record("verify", rt)
        }

        async fn teardown(&self, _list: &NetworkConfigList, rt: &RuntimeConf) -> RelayResult<()> {
            self.record("teardown", rt)
        }
    }

    fn service(invoker: &Arc<RecordingInvoker>) -> CniRelayService {
        CniRelayService::new(Arc::clone(invoker) as Arc<dyn ChainInvoker>)
    }

    fn add_request(netns: &str, if_name: &str) -> Request<AddRequest> {
        Request::new(AddRequest {
            conf: CONF.to_string(),
            netns: netns.to_string(),
            if_name: if_name.to_string(),
            cni_args: String::new(),
            cap_args: None,
        })
    }

    #[tokio::test]
    async fn add_returns_delegate_result() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        let response = svc
            .add(add_request("/var/run/netns/ns1", ""))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.stdout, r#"{"cniVersion": "1.0.0", "ips": []}"#);

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        let (op, rt) = &calls[0];
        assert_eq!(*op, "realize");
        assert_eq!(rt.if_name, "eth0");
        assert!(rt.args.is_empty());
        assert!(rt.capability_args.is_empty());
        assert_eq!(
            rt.container_id,
            derive_container_id("/var/run/netns/ns1")
        );
    }

    #[tokio::test]
    async fn empty_netns_never_reaches_delegate() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        let status = svc.add(add_request("", "")).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = svc
            .check(Request::new(CheckRequest {
                conf: CONF.to_string(),
                netns: String::new(),
                if_name: String::new(),
                cni_args: String::new(),
                cap_args: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = svc
            .del(Request::new(DelRequest {
                conf: CONF.to_string(),
                netns: String::new(),
                if_name: String::new(),
                cni_args: String::new(),
                cap_args: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn delegate_error_is_propagated_without_retry() {
        let invoker = Arc::new(RecordingInvoker::failing("bridge exploded"));
        let svc = service(&invoker);

        let status = svc
            .add(add_request("/var/run/netns/ns1", ""))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("bridge exploded"));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn check_success_has_empty_error() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        let response = svc
            .check(Request::new(CheckRequest {
                conf: CONF.to_string(),
                netns: "/var/run/netns/ns1".to_string(),
                if_name: "net1".to_string(),
                cni_args: String::new(),
                cap_args: None,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.error.is_empty());
        assert_eq!(invoker.calls()[0].1.if_name, "net1");
    }

    #[tokio::test]
    async fn del_matches_identity_of_prior_add() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        svc.add(add_request("/var/run/netns/ns1", "")).await.unwrap();
        svc.del(Request::new(DelRequest {
            conf: CONF.to_string(),
            netns: "/var/run/netns/ns1".to_string(),
            if_name: String::new(),
            cni_args: String::new(),
            cap_args: None,
        }))
        .await
        .unwrap();

        let calls = invoker.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1.container_id, calls[1].1.container_id);
        assert_eq!(calls[1].0, "teardown");
    }

    #[tokio::test]
    async fn capability_args_survive_the_relay() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        let caps = CapabilityArgs::parse(
            r#"{"portMappings": [{"hostPort": 8080, "containerPort": 80, "protocol": "tcp"}]}"#,
        )
        .unwrap();
        let mut request = add_request("/var/run/netns/ns1", "");
        request.get_mut().cap_args = Some(caps.clone().into());

        svc.add(request).await.unwrap();

        let rt = invoker.calls()[0].1.clone();
        assert_eq!(rt.capability_args, caps.to_untyped().unwrap());
    }

    #[tokio::test]
    async fn malformed_cni_args_are_invalid_argument() {
        let invoker = Arc::new(RecordingInvoker::ok());
        let svc = service(&invoker);

        let mut request = add_request("/var/run/netns/ns1", "");
        request.get_mut().cni_args = "a=1;b".to_string();

        let status = svc.add(request).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(invoker.calls().is_empty());
    }
}
