use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shellgate_core::{GatewayConfig, GatewayError};

pub const INTERNAL_API_PATH: &str = "/api/v4/internal";
pub const SECRET_HEADER_NAME: &str = "gitlab-shared-secret";

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Decoded internal API response plus its transport status.
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: T,
}

#[derive(Debug, Clone)]
/// Authenticated JSON client for the internal API.
pub struct GitlabClient {
    http: reqwest::Client,
    host: String,
    basic_auth: Option<(String, String)>,
}

impl GitlabClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let host = config.gitlab_url.trim().trim_end_matches('/').to_string();
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(GatewayError::UnsupportedProtocol(host));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        let encoded_secret = STANDARD.encode(config.secret.as_bytes());
        headers.insert(
            HeaderName::from_static(SECRET_HEADER_NAME),
            HeaderValue::from_str(&encoded_secret).map_err(|error| {
                GatewayError::Config(format!("invalid shared secret header: {error}"))
            })?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.http_settings.read_timeout.max(1)))
            .build()
            .map_err(|error| {
                GatewayError::Config(format!("failed to construct internal API client: {error}"))
            })?;

        Ok(Self {
            http,
            host,
            basic_auth: config
                .basic_auth()
                .map(|(user, password)| (user.to_string(), password.to_string())),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, GatewayError> {
        self.send::<(), T>(Method::GET, &normalize_path(path), None, &[])
            .await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, GatewayError> {
        self.send::<(), T>(Method::GET, &normalize_path(path), None, query)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, &normalize_path(path), Some(body), &[])
            .await
    }

    /// Issues a request against a raw path, without the internal API prefix.
    pub async fn do_request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(method, path, body, &[]).await
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.host, path);
        let mut request = self.http.request(method.clone(), url.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, Some(password));
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|error| {
            tracing::warn!(method = %method, path, error = %error, "internal API unreachable");
            GatewayError::Unreachable
        })?;
        let status = response.status();
        let body = response.bytes().await.ok();
        tracing::debug!(
            method = %method,
            path,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "internal API request finished"
        );

        parse_response(status, body.as_deref())
    }
}

fn normalize_path(path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if path.starts_with(INTERNAL_API_PATH) {
        path
    } else {
        format!("{INTERNAL_API_PATH}{path}")
    }
}

fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: Option<&[u8]>,
) -> Result<ApiResponse<T>, GatewayError> {
    let code = status.as_u16();
    if !(200..=399).contains(&code) {
        let message =
            body.and_then(|bytes| serde_json::from_slice::<Option<ErrorResponse>>(bytes).ok());
        return Err(match message {
            Some(error) => GatewayError::Forbidden(error.unwrap_or_default().message),
            None => GatewayError::InternalApiError(code),
        });
    }

    let bytes = body.ok_or(GatewayError::ParseFailure)?;
    let parsed = serde_json::from_slice(bytes).map_err(|_| GatewayError::ParseFailure)?;
    Ok(ApiResponse {
        status: code,
        body: parsed,
    })
}
