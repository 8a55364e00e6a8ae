use shellgate_command::build_command;
use shellgate_commandargs::{CommandArgs, SshEnvironment};
use shellgate_core::{GatewayConfig, GatewayError, ReadWriter};
use tokio::sync::watch;

/// Resolves the invocation and runs the matching command to completion.
pub async fn execute(
    arguments: &[String],
    environment: &SshEnvironment,
    config: &GatewayConfig,
    read_writer: &mut ReadWriter<'_>,
    cancel: watch::Receiver<bool>,
) -> Result<i32, GatewayError> {
    let args = CommandArgs::parse(arguments, environment)?;
    let command = build_command(args, config)?;
    let exit_code = command.execute(read_writer, cancel).await?;
    tracing::debug!(command = command.name(), exit_code, "command finished");
    Ok(exit_code)
}
