use async_trait::async_trait;
use shellgate_commandargs::CommandArgs;
use shellgate_core::{GatewayConfig, GatewayError, ReadWriter};
use shellgate_gitlabnet::TwoFactorRecoverClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::watch;

use crate::Command;

const QUESTION: &str = "Are you sure you want to generate new two-factor recovery codes?\n\
Any existing recovery codes you saved will be invalidated. (yes/no)\n";
const CODES_HEADER: &str = "\nYour two-factor authentication recovery codes are:\n\n";
const CODES_FOOTER: &str = "\n\nDuring sign in, use one of the codes above when prompted for\n\
your two-factor code. Then, visit your Profile Settings and add\n\
a new device so you do not lose access to your account again.\n";
const ERROR_HEADER: &str = "\nAn error occurred while trying to generate new recovery codes.\n";
const DECLINED: &str =
    "\nNew recovery codes have *not* been generated. Existing codes will remain valid.\n";

/// Interactive two-factor recovery code regeneration.
///
/// API failures are reported in the dialog rather than failing the command.
pub struct TwoFactorRecoverCommand {
    args: CommandArgs,
    client: TwoFactorRecoverClient,
}

impl TwoFactorRecoverCommand {
    pub fn new(args: CommandArgs, config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            args,
            client: TwoFactorRecoverClient::new(config)?,
        })
    }

    async fn recovery_codes_message(&self) -> String {
        match self.client.get_recovery_codes(&self.args).await {
            Ok(codes) => format!("{CODES_HEADER}{}{CODES_FOOTER}", codes.join("\n")),
            Err(error) => {
                tracing::debug!(error = %error, "two-factor recovery code generation failed");
                format!("{ERROR_HEADER}{error}\n")
            }
        }
    }
}

#[async_trait]
impl Command for TwoFactorRecoverCommand {
    fn name(&self) -> &'static str {
        "twofactorrecover"
    }

    async fn execute(
        &self,
        read_writer: &mut ReadWriter<'_>,
        _cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError> {
        read_writer.out.write_all(QUESTION.as_bytes()).await?;
        read_writer.out.flush().await?;

        let mut answer = String::new();
        read_writer.input.read_line(&mut answer).await?;

        let message = if answer.trim() == "yes" {
            self.recovery_codes_message().await
        } else {
            DECLINED.to_string()
        };
        read_writer.out.write_all(message.as_bytes()).await?;
        read_writer.out.flush().await?;
        Ok(0)
    }
}
