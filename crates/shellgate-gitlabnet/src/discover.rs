use serde::Deserialize;
use shellgate_commandargs::CommandArgs;
use shellgate_core::{GatewayConfig, GatewayError};

use crate::client::GitlabClient;

const DISCOVER_PATH: &str = "/discover";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiscoverResponse {
    #[serde(rename = "id", default)]
    pub user_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

impl DiscoverResponse {
    pub fn is_anonymous(&self) -> bool {
        self.user_id < 1
    }
}

#[derive(Debug, Clone)]
/// Looks up the account behind an SSH identity.
pub struct DiscoverClient {
    client: GitlabClient,
}

impl DiscoverClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: GitlabClient::new(config)?,
        })
    }

    pub fn from_client(client: GitlabClient) -> Self {
        Self { client }
    }

    pub async fn get_by_command_args(
        &self,
        args: &CommandArgs,
    ) -> Result<DiscoverResponse, GatewayError> {
        let query = match (non_empty(&args.gitlab_username), non_empty(&args.gitlab_key_id)) {
            (Some(username), _) => ("username", username),
            (None, Some(key_id)) => ("key_id", key_id),
            (None, None) => return Err(GatewayError::MissingIdentity),
        };

        // `null` means no account matched
        let response = self
            .client
            .get_with_query::<Option<DiscoverResponse>>(DISCOVER_PATH, &[query])
            .await?;
        Ok(response.body.unwrap_or_default())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
