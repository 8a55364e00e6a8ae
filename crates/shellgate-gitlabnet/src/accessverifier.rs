use serde::{Deserialize, Deserializer, Serialize};
use shellgate_commandargs::{CommandArgs, CommandType};
use shellgate_core::{write_console_message, GatewayConfig, GatewayError};
use tokio::io::AsyncWrite;

use crate::client::GitlabClient;

const ALLOWED_PATH: &str = "/allowed";
const SSH_ENV: &str = "ssh";
const ANY_CHANGES: &str = "_any";
const CUSTOM_ACTION_STATUS: u16 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessVerifierRequest {
    pub action: String,
    #[serde(rename = "project")]
    pub repo: String,
    pub changes: String,
    pub env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl AccessVerifierRequest {
    /// Username wins over key id when both are set.
    pub fn new(args: &CommandArgs, action: &CommandType, repo: &str) -> Self {
        let username = args
            .gitlab_username
            .clone()
            .filter(|username| !username.is_empty());
        let key_id = match username {
            Some(_) => None,
            None => args.gitlab_key_id.clone().filter(|key_id| !key_id.is_empty()),
        };
        Self {
            action: action.as_str().to_string(),
            repo: repo.to_string(),
            changes: ANY_CHANGES.to_string(),
            env: SSH_ENV.to_string(),
            key_id,
            username,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GitalyRepository {
    #[serde(default, deserialize_with = "null_as_default")]
    pub storage_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relative_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_object_directory: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_alternate_object_directories: Vec<String>,
    #[serde(rename = "gl_repository", default, deserialize_with = "null_as_default")]
    pub repo_name: String,
    #[serde(rename = "gl_project_path", default, deserialize_with = "null_as_default")]
    pub project_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Where and how to reach the repository backend for a direct operation.
pub struct GitalyRoute {
    #[serde(rename = "repository", default, deserialize_with = "null_as_default")]
    pub repo: GitalyRepository,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPayloadData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_endpoints: Vec<String>,
    #[serde(rename = "gl_username", default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_repo: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info_message: String,
    #[serde(
        rename = "gl_id",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: CustomPayloadData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Authorization outcome returned by `POST /allowed`.
///
/// Every field is optional on the wire; absent or `null` values decode to
/// their zero value.
pub struct AccessVerifierResponse {
    #[serde(rename = "status", default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "gl_repository", default, deserialize_with = "null_as_default")]
    pub repo: String,
    #[serde(rename = "gl_id", default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(rename = "gl_username", default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_config_options: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gitaly: GitalyRoute,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_protocol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: CustomPayload,
    #[serde(rename = "gl_console_messages", default, deserialize_with = "null_as_default")]
    pub console_messages: Vec<String>,
    #[serde(skip)]
    pub status_code: u16,
}

impl AccessVerifierResponse {
    /// True only for a `300 Multiple Choices` transport status.
    pub fn is_custom_action(&self) -> bool {
        self.status_code == CUSTOM_ACTION_STATUS
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct AccessVerifierClient {
    client: GitlabClient,
}

impl AccessVerifierClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: GitlabClient::new(config)?,
        })
    }

    pub fn client(&self) -> &GitlabClient {
        &self.client
    }

    /// Asks the internal API whether `args` may run `action` on `repo`.
    ///
    /// Console messages from an allowed response are written to `out` before
    /// returning. A denial surfaces the server message as
    /// [`GatewayError::Forbidden`].
    pub async fn verify(
        &self,
        args: &CommandArgs,
        action: &CommandType,
        repo: &str,
        out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<AccessVerifierResponse, GatewayError> {
        let request = AccessVerifierRequest::new(args, action, repo);
        let api_response = self
            .client
            .post::<_, AccessVerifierResponse>(ALLOWED_PATH, &request)
            .await?;

        let mut response = api_response.body;
        response.status_code = api_response.status;
        if !response.success {
            tracing::debug!(action = %action, repo, "access denied by internal API");
            return Err(GatewayError::Forbidden(response.message));
        }

        tracing::debug!(
            action = %action,
            repo,
            status = response.status_code,
            custom_action = response.is_custom_action(),
            "access granted"
        );
        for message in &response.console_messages {
            write_console_message(out, message).await?;
        }

        Ok(response)
    }
}
