//! Clients for the internal HTTP API.
//!
//! [`GitlabClient`] owns transport, authentication and response
//! classification; the remaining modules are typed endpoints on top of it.

pub mod accessverifier;
pub mod client;
pub mod discover;
pub mod twofactorrecover;

pub use accessverifier::{
    AccessVerifierClient, AccessVerifierRequest, AccessVerifierResponse, CustomPayload,
    CustomPayloadData, GitalyRepository, GitalyRoute,
};
pub use client::{ApiResponse, GitlabClient, INTERNAL_API_PATH, SECRET_HEADER_NAME};
pub use discover::{DiscoverClient, DiscoverResponse};
pub use twofactorrecover::{RecoveryCodesRequest, TwoFactorRecoverClient};
