//! Receive-pack proxying to the repository backend.
//!
//! [`proxy_receive_pack`] drives one bidirectional gRPC stream through a
//! [`ReceivePackConnector`]; [`GitalyConnector`] is the network-backed one.

pub mod bridge;
pub mod client;
pub mod proto;

pub use bridge::{proxy_receive_pack, STREAM_CHUNK_SIZE};
pub use client::{
    v2_authorization, GitalyConnector, GitalyTarget, ReceivePackConnector, ReceivePackResponses,
};
pub use proto::{ExitStatus, Repository, SshReceivePackRequest, SshReceivePackResponse};
