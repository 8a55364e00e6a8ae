use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use shellgate_core::{write_console_message, GatewayError, ReadWriter};
use shellgate_gitlabnet::{AccessVerifierResponse, CustomPayloadData, GitlabClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomActionRequest {
    pub data: CustomPayloadData,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomActionResponse {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub message: String,
}

/// Turn-taking exchange with the server-supplied custom action endpoints.
pub struct CustomAction<'a> {
    client: &'a GitlabClient,
}

impl<'a> CustomAction<'a> {
    pub fn new(client: &'a GitlabClient) -> Self {
        Self { client }
    }

    /// POSTs to each endpoint in order, shows the decoded result and sends
    /// the user's reply with the next step. The first failure ends the run.
    pub async fn run(
        &self,
        response: &AccessVerifierResponse,
        read_writer: &mut ReadWriter<'_>,
    ) -> Result<(), GatewayError> {
        let data = &response.payload.data;
        if data.api_endpoints.is_empty() {
            return Err(GatewayError::EmptyEndpoints);
        }

        if !data.info_message.is_empty() {
            write_console_message(&mut *read_writer.out, &data.info_message).await?;
        }

        let mut request = CustomActionRequest {
            data: CustomPayloadData {
                user_id: response.user_id.clone(),
                ..data.clone()
            },
            output: String::new(),
        };

        for (step, endpoint) in data.api_endpoints.iter().enumerate() {
            tracing::debug!(
                action = %response.payload.action,
                step,
                endpoint = %endpoint,
                "running custom action step"
            );
            let step_response = self
                .client
                .do_request::<_, CustomActionResponse>(Method::POST, endpoint, Some(&request))
                .await?
                .body;

            display_result(&step_response.result, read_writer).await?;
            request.output = read_reply(read_writer).await?;
        }

        Ok(())
    }
}

async fn display_result(result: &str, read_writer: &mut ReadWriter<'_>) -> Result<(), GatewayError> {
    let decoded = STANDARD
        .decode(result)
        .map_err(|error| GatewayError::InvalidPayload(error.to_string()))?;
    read_writer.out.write_all(&decoded).await?;
    read_writer.out.write_all(b"\n").await?;
    read_writer.out.flush().await?;
    Ok(())
}

async fn read_reply(read_writer: &mut ReadWriter<'_>) -> Result<String, GatewayError> {
    let mut line = String::new();
    read_writer.input.read_line(&mut line).await?;
    let reply = line.trim_end_matches(['\r', '\n']);
    Ok(STANDARD.encode(reply.as_bytes()))
}
