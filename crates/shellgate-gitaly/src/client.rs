use std::path::PathBuf;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use hmac::{Hmac, Mac};
use hyper_util::rt::TokioIo;
use sha2::Sha256;
use shellgate_core::{current_unix_timestamp, GatewayError};
use tokio::net::UnixStream;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::proto::{SshReceivePackRequest, SshReceivePackResponse, SSH_RECEIVE_PACK_PATH};

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix:";
// Placeholder authority for unix socket channels; the connector ignores it.
const UNIX_PLACEHOLDER_URI: &str = "http://[::]:50051";

/// Address and credentials of one backend node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitalyTarget {
    pub address: String,
    pub token: String,
}

pub type ReceivePackResponses = BoxStream<'static, Result<SshReceivePackResponse, GatewayError>>;

#[async_trait]
/// Opens the bidirectional receive-pack call against a backend.
pub trait ReceivePackConnector: Send + Sync {
    async fn open(
        &self,
        target: &GitalyTarget,
        requests: ReceiverStream<SshReceivePackRequest>,
    ) -> Result<ReceivePackResponses, GatewayError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// gRPC connector dialing `tcp://` and `unix:` addresses.
pub struct GitalyConnector;

#[async_trait]
impl ReceivePackConnector for GitalyConnector {
    async fn open(
        &self,
        target: &GitalyTarget,
        requests: ReceiverStream<SshReceivePackRequest>,
    ) -> Result<ReceivePackResponses, GatewayError> {
        let channel = dial(&target.address).await?;
        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|error| GatewayError::Rpc(format!("service was not ready: {error}")))?;

        let mut request = tonic::Request::new(requests);
        if !target.token.is_empty() {
            let header = v2_authorization(&target.token, current_unix_timestamp())?;
            let value = MetadataValue::try_from(header.as_str())
                .map_err(|error| GatewayError::Rpc(format!("invalid token metadata: {error}")))?;
            request.metadata_mut().insert("authorization", value);
        }

        let codec: ProstCodec<SshReceivePackRequest, SshReceivePackResponse> =
            ProstCodec::default();
        let response = grpc
            .streaming(
                request,
                PathAndQuery::from_static(SSH_RECEIVE_PACK_PATH),
                codec,
            )
            .await
            .map_err(|status| GatewayError::Rpc(status.message().to_string()))?;

        Ok(response
            .into_inner()
            .map(|item| item.map_err(|status| GatewayError::Rpc(status.message().to_string())))
            .boxed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GitalyAddress {
    Tcp(String),
    Unix(PathBuf),
}

fn parse_address(address: &str) -> Result<GitalyAddress, GatewayError> {
    if let Some(authority) = address.strip_prefix(TCP_SCHEME) {
        if !authority.is_empty() {
            return Ok(GitalyAddress::Tcp(authority.to_string()));
        }
    }
    if let Some(path) = address.strip_prefix(UNIX_SCHEME) {
        let path = path.strip_prefix("//").unwrap_or(path);
        if !path.is_empty() {
            return Ok(GitalyAddress::Unix(PathBuf::from(path)));
        }
    }
    Err(GatewayError::Rpc(format!(
        "unsupported gitaly address: {address:?}"
    )))
}

async fn dial(address: &str) -> Result<Channel, GatewayError> {
    let connect_error =
        |error: tonic::transport::Error| GatewayError::Rpc(format!("failed to connect: {error}"));

    match parse_address(address)? {
        GitalyAddress::Tcp(authority) => {
            tracing::debug!(address, "dialing gitaly over tcp");
            Endpoint::from_shared(format!("http://{authority}"))
                .map_err(connect_error)?
                .connect()
                .await
                .map_err(connect_error)
        }
        GitalyAddress::Unix(path) => {
            tracing::debug!(address, "dialing gitaly over unix socket");
            Endpoint::from_static(UNIX_PLACEHOLDER_URI)
                .connect_with_connector(service_fn(move |_: Uri| {
                    let path = path.clone();
                    async move {
                        let stream = UnixStream::connect(path).await?;
                        Ok::<_, std::io::Error>(TokioIo::new(stream))
                    }
                }))
                .await
                .map_err(connect_error)
        }
    }
}

/// `Bearer v2.<hex hmac-sha256(token, timestamp)>.<timestamp>`
pub fn v2_authorization(token: &str, timestamp: u64) -> Result<String, GatewayError> {
    let issued_at = timestamp.to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(token.as_bytes())
        .map_err(|error| GatewayError::Rpc(format!("invalid gitaly token: {error}")))?;
    mac.update(issued_at.as_bytes());
    let signature = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    Ok(format!("Bearer v2.{signature}.{issued_at}"))
}
