use thiserror::Error;

#[derive(Debug, Error)]
/// Failure kinds surfaced by the gateway to the SSH user.
///
/// The `Display` output of each variant is the exact message printed on the
/// session error stream before the process exits non-zero.
pub enum GatewayError {
    #[error("Only SSH allowed")]
    NotSsh,
    #[error("Internal API unreachable")]
    Unreachable,
    #[error("Parsing failed")]
    ParseFailure,
    #[error("Internal API error ({0})")]
    InternalApiError(u16),
    /// Server-authored denial, shown verbatim.
    #[error("{0}")]
    Forbidden(String),
    #[error("Custom action error: Empty Api endpoints")]
    EmptyEndpoints,
    #[error("> GitLab: Disallowed command")]
    DisallowedCommand,
    #[error("who='' is invalid")]
    MissingIdentity,
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    #[error("Custom action error: invalid result payload: {0}")]
    InvalidPayload(String),
    #[error("Gitaly error: {0}")]
    Rpc(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}
