use std::sync::Arc;

use async_trait::async_trait;
use shellgate_commandargs::{CommandArgs, CommandType};
use shellgate_core::{GatewayConfig, GatewayError, ReadWriter};
use shellgate_gitaly::ReceivePackConnector;
use shellgate_gitlabnet::{AccessVerifierClient, AccessVerifierResponse};
use tokio::sync::watch;

use crate::customaction::CustomAction;
use crate::receivepack::ReceivePack;
use crate::Command;

/// Repository-mutating git commands: `git-receive-pack <repo>`.
///
/// Access is always verified first. Verbs without a handler are still sent
/// to the internal API so the denial message comes from the server.
pub struct GitUpdateCommand {
    args: CommandArgs,
    verifier: AccessVerifierClient,
    connector: Arc<dyn ReceivePackConnector>,
}

impl GitUpdateCommand {
    pub fn new(
        args: CommandArgs,
        config: &GatewayConfig,
        connector: Arc<dyn ReceivePackConnector>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            args,
            verifier: AccessVerifierClient::new(config)?,
            connector,
        })
    }

    async fn receive_pack(
        &self,
        response: &AccessVerifierResponse,
        read_writer: &mut ReadWriter<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError> {
        if response.is_custom_action() {
            CustomAction::new(self.verifier.client())
                .run(response, read_writer)
                .await?;
            return Ok(0);
        }

        ReceivePack::new(self.connector.as_ref())
            .run(response, read_writer, cancel)
            .await
    }
}

#[async_trait]
impl Command for GitUpdateCommand {
    fn name(&self) -> &'static str {
        "gitupdate"
    }

    async fn execute(
        &self,
        read_writer: &mut ReadWriter<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError> {
        let [_, repo] = self.args.ssh_args.as_slice() else {
            return Err(GatewayError::DisallowedCommand);
        };

        let response = self
            .verifier
            .verify(&self.args, &self.args.command_type, repo, &mut *read_writer.out)
            .await?;

        match &self.args.command_type {
            CommandType::ReceivePack => self.receive_pack(&response, read_writer, cancel).await,
            other => {
                tracing::warn!(command = %other, "internal API allowed a command without a handler");
                Err(GatewayError::DisallowedCommand)
            }
        }
    }
}
