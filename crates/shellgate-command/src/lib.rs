//! Command dispatch for one SSH invocation.
//!
//! [`build_command`] picks the handler for a resolved [`CommandArgs`]; every
//! handler runs against the session [`ReadWriter`] and returns the process
//! exit code.

use std::sync::Arc;

use async_trait::async_trait;
use shellgate_commandargs::{CommandArgs, CommandType};
use shellgate_core::{GatewayConfig, GatewayError, ReadWriter};
use shellgate_gitaly::{GitalyConnector, ReceivePackConnector};
use tokio::sync::watch;

pub mod customaction;
pub mod discover;
pub mod gitupdate;
pub mod receivepack;
pub mod twofactorrecover;

pub use discover::DiscoverCommand;
pub use gitupdate::GitUpdateCommand;
pub use twofactorrecover::TwoFactorRecoverCommand;

#[async_trait]
/// A runnable gateway command.
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        read_writer: &mut ReadWriter<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError>;
}

pub fn build_command(
    args: CommandArgs,
    config: &GatewayConfig,
) -> Result<Box<dyn Command>, GatewayError> {
    build_command_with_connector(args, config, Arc::new(GitalyConnector))
}

/// Like [`build_command`] with an explicit backend connector.
pub fn build_command_with_connector(
    args: CommandArgs,
    config: &GatewayConfig,
    connector: Arc<dyn ReceivePackConnector>,
) -> Result<Box<dyn Command>, GatewayError> {
    let command: Box<dyn Command> = match args.command_type {
        CommandType::Discover => Box::new(DiscoverCommand::new(args, config)?),
        CommandType::TwoFactorRecover => Box::new(TwoFactorRecoverCommand::new(args, config)?),
        CommandType::ReceivePack | CommandType::Unknown(_) => {
            Box::new(GitUpdateCommand::new(args, config, connector)?)
        }
    };
    tracing::debug!(command = command.name(), "built command");
    Ok(command)
}
