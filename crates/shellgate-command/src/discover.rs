use async_trait::async_trait;
use shellgate_commandargs::CommandArgs;
use shellgate_core::{GatewayConfig, GatewayError, ReadWriter};
use shellgate_gitlabnet::DiscoverClient;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

use crate::Command;

/// Greets the user behind the SSH key.
pub struct DiscoverCommand {
    args: CommandArgs,
    client: DiscoverClient,
}

impl DiscoverCommand {
    pub fn new(args: CommandArgs, config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            args,
            client: DiscoverClient::new(config)?,
        })
    }
}

#[async_trait]
impl Command for DiscoverCommand {
    fn name(&self) -> &'static str {
        "discover"
    }

    async fn execute(
        &self,
        read_writer: &mut ReadWriter<'_>,
        _cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError> {
        let user = self.client.get_by_command_args(&self.args).await?;
        let greeting = if user.is_anonymous() {
            "Welcome to GitLab, Anonymous!\n".to_string()
        } else {
            format!("Welcome to GitLab, @{}!\n", user.username)
        };
        read_writer.out.write_all(greeting.as_bytes()).await?;
        read_writer.out.flush().await?;
        Ok(0)
    }
}
