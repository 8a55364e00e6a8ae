use serde::{Deserialize, Serialize};
use shellgate_commandargs::CommandArgs;
use shellgate_core::{GatewayConfig, GatewayError};

use crate::client::GitlabClient;
use crate::discover::DiscoverClient;

const RECOVERY_CODES_PATH: &str = "/two_factor_recovery_codes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecoveryCodesRequest {
    KeyId { key_id: String },
    UserId {
        #[serde(skip_serializing_if = "is_unknown_user")]
        user_id: i64,
    },
}

fn is_unknown_user(user_id: &i64) -> bool {
    *user_id == 0
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct RecoveryCodesResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    recovery_codes: Option<Vec<String>>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct TwoFactorRecoverClient {
    client: GitlabClient,
    discover: DiscoverClient,
}

impl TwoFactorRecoverClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = GitlabClient::new(config)?;
        Ok(Self {
            discover: DiscoverClient::from_client(client.clone()),
            client,
        })
    }

    /// Regenerates the caller's two-factor recovery codes.
    pub async fn get_recovery_codes(&self, args: &CommandArgs) -> Result<Vec<String>, GatewayError> {
        let request = self.request_body(args).await?;
        let response = self
            .client
            .post::<_, RecoveryCodesResponse>(RECOVERY_CODES_PATH, &request)
            .await?
            .body;

        if response.success {
            Ok(response.recovery_codes.unwrap_or_default())
        } else {
            Err(GatewayError::Forbidden(response.message))
        }
    }

    async fn request_body(&self, args: &CommandArgs) -> Result<RecoveryCodesRequest, GatewayError> {
        match args.gitlab_key_id.as_deref().filter(|key_id| !key_id.is_empty()) {
            Some(key_id) => Ok(RecoveryCodesRequest::KeyId {
                key_id: key_id.to_string(),
            }),
            None => {
                let user = self.discover.get_by_command_args(args).await?;
                Ok(RecoveryCodesRequest::UserId {
                    user_id: user.user_id,
                })
            }
        }
    }
}
