use std::{fs, path::Path, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::StreamExt;
use httpmock::prelude::*;
use serde_json::json;
use shellgate_command::build_command_with_connector;
use shellgate_commandargs::{CommandArgs, SshEnvironment};
use shellgate_core::{load_config, GatewayConfig, GatewayError, ReadWriter};
use shellgate_gitaly::{
    ExitStatus, GitalyTarget, ReceivePackConnector, ReceivePackResponses, SshReceivePackRequest,
    SshReceivePackResponse,
};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio_stream::wrappers::ReceiverStream;

/// In-memory backend: records every frame, acknowledges the pushed bytes on
/// stdout and exits with a fixed status once the client closes its stream.
#[derive(Default)]
struct ScriptedBackend {
    targets: AsyncMutex<Vec<GitalyTarget>>,
    frames: Arc<AsyncMutex<Vec<SshReceivePackRequest>>>,
}

impl ScriptedBackend {
    async fn open_count(&self) -> usize {
        self.targets.lock().await.len()
    }
}

#[async_trait]
impl ReceivePackConnector for ScriptedBackend {
    async fn open(
        &self,
        target: &GitalyTarget,
        mut requests: ReceiverStream<SshReceivePackRequest>,
    ) -> Result<ReceivePackResponses, GatewayError> {
        self.targets.lock().await.push(target.clone());
        let frames = Arc::clone(&self.frames);
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let mut received = 0usize;
            while let Some(frame) = requests.next().await {
                received += frame.stdin.len();
                frames.lock().await.push(frame);
            }
            let _ = tx
                .send(Ok(SshReceivePackResponse {
                    stdout: format!("received {received} bytes\n").into_bytes(),
                    stderr: b"remote: hooks ran\n".to_vec(),
                    exit_status: Some(ExitStatus { value: 0 }),
                }))
                .await;
        });
        Ok(ReceiverStream::new(rx).boxed())
    }
}

struct Session {
    out: String,
    err_out: String,
    result: Result<i32, GatewayError>,
}

async fn run_session(
    arguments: &[&str],
    original_command: &str,
    config: &GatewayConfig,
    backend: Arc<ScriptedBackend>,
    input: &str,
) -> Session {
    let arguments = arguments
        .iter()
        .map(|argument| argument.to_string())
        .collect::<Vec<_>>();
    let args = CommandArgs::parse(&arguments, &SshEnvironment::ssh(original_command))
        .expect("ssh arguments must resolve");
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let mut out = Vec::new();
    let mut err_out = Vec::new();
    let mut input = input.as_bytes();

    let result = match build_command_with_connector(args, config, backend) {
        Ok(command) => {
            let mut read_writer = ReadWriter::new(&mut out, &mut err_out, &mut input);
            command.execute(&mut read_writer, cancel_rx).await
        }
        Err(error) => Err(error),
    };

    Session {
        out: String::from_utf8(out).expect("stdout must be utf8"),
        err_out: String::from_utf8(err_out).expect("stderr must be utf8"),
        result,
    }
}

fn write_gateway_root(root: &Path, gitlab_url: &str) {
    fs::write(
        root.join("config.yml"),
        format!("gitlab_url: \"{gitlab_url}\"\nhttp_settings:\n  read_timeout: 5\n"),
    )
    .expect("write config");
    fs::write(root.join(".gitlab_shell_secret"), "integration-secret\n").expect("write secret");
}

#[tokio::test]
async fn integration_push_is_verified_then_streamed_through_backend() {
    let server = MockServer::start_async().await;
    let allowed = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/internal/allowed")
            .header("gitlab-shared-secret", STANDARD.encode("integration-secret"))
            .json_body(json!({
                "action": "git-receive-pack",
                "project": "group/project",
                "changes": "_any",
                "env": "ssh",
                "key_id": "42"
            }));
        then.status(200).json_body(json!({
            "status": true,
            "gl_repository": "project-7",
            "gl_id": "user-3",
            "gl_username": "jane",
            "git_protocol": "version=2",
            "git_config_options": ["receive.fsckObjects=true"],
            "gitaly": {
                "repository": {
                    "storage_name": "default",
                    "relative_path": "@hashed/aa/bb/project.git",
                    "gl_repository": "project-7",
                    "gl_project_path": "group/project"
                },
                "address": "tcp://gitaly.internal:8075",
                "token": "gitaly-token"
            },
            "gl_console_messages": ["Welcome back"]
        }));
    });
    let root = tempfile::tempdir().expect("tempdir");
    write_gateway_root(root.path(), &server.base_url());
    let config = load_config(root.path()).expect("config");
    let backend = Arc::new(ScriptedBackend::default());

    let session = run_session(
        &["key-42"],
        "git receive-pack 'group/project'",
        &config,
        Arc::clone(&backend),
        "0032want-packfile",
    )
    .await;

    assert_eq!(session.result.expect("push must succeed"), 0);
    allowed.assert_calls(1);
    assert_eq!(session.out, "> GitLab: Welcome back\nreceived 17 bytes\n");
    assert_eq!(session.err_out, "remote: hooks ran\n");

    let targets = backend.targets.lock().await;
    assert_eq!(targets[0].address, "tcp://gitaly.internal:8075");
    assert_eq!(targets[0].token, "gitaly-token");
    let frames = backend.frames.lock().await;
    let header = &frames[0];
    let repository = header.repository.as_ref().expect("header carries repository");
    assert_eq!(repository.relative_path, "@hashed/aa/bb/project.git");
    assert_eq!(header.gl_id, "user-3");
    assert_eq!(header.gl_username, "jane");
    assert_eq!(header.git_protocol, "version=2");
    assert_eq!(header.git_config_options, vec!["receive.fsckObjects=true".to_string()]);
    assert!(frames[1..].iter().all(|frame| frame.repository.is_none()));
}

#[tokio::test]
async fn integration_custom_action_replaces_backend_stream() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/v4/internal/allowed");
        then.status(300).json_body(json!({
            "status": true,
            "gl_id": "user-3",
            "payload": {
                "action": "geo_proxy_to_primary",
                "data": {
                    "api_endpoints": ["/api/v4/geo/proxy_git_ssh/info_refs_receive_pack", "/api/v4/geo/proxy_git_ssh/receive_pack"],
                    "gl_username": "jane",
                    "primary_repo": "https://primary.example.com/group/project.git",
                    "info_message": "Proxying to primary"
                }
            },
            "gl_console_messages": ["Secondary site"]
        }));
    });
    let info_refs = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/geo/proxy_git_ssh/info_refs_receive_pack")
            .json_body_includes(json!({"output": "", "data": {"gl_id": "user-3"}}).to_string());
        then.status(200)
            .json_body(json!({"result": STANDARD.encode("refs advertised")}));
    });
    let receive_pack = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/geo/proxy_git_ssh/receive_pack")
            .json_body_includes(json!({"output": STANDARD.encode("0000")}).to_string());
        then.status(200)
            .json_body(json!({"result": STANDARD.encode("pushed")}));
    });
    let config = GatewayConfig::new(server.base_url(), "integration-secret");
    let backend = Arc::new(ScriptedBackend::default());

    let session = run_session(
        &["username-jane"],
        "git-receive-pack group/project",
        &config,
        Arc::clone(&backend),
        "0000\n",
    )
    .await;

    assert_eq!(session.result.expect("custom action must succeed"), 0);
    info_refs.assert_calls(1);
    receive_pack.assert_calls(1);
    assert_eq!(
        session.out,
        "> GitLab: Secondary site\n> GitLab: Proxying to primary\nrefs advertised\npushed\n"
    );
    assert_eq!(backend.open_count().await, 0);
}

#[tokio::test]
async fn integration_denied_push_never_reaches_backend() {
    let server = MockServer::start_async().await;
    let allowed = server.mock(|when, then| {
        when.method(POST).path("/api/v4/internal/allowed");
        then.status(200).json_body(json!({
            "status": false,
            "message": "You are not allowed to push code to this project."
        }));
    });
    let config = GatewayConfig::new(server.base_url(), "integration-secret");
    let backend = Arc::new(ScriptedBackend::default());

    let session = run_session(
        &["key-9"],
        "git-receive-pack group/project",
        &config,
        Arc::clone(&backend),
        "",
    )
    .await;

    allowed.assert_calls(1);
    assert_eq!(
        session.result.expect_err("push must be denied").to_string(),
        "You are not allowed to push code to this project."
    );
    assert!(session.out.is_empty());
    assert_eq!(backend.open_count().await, 0);
}

#[tokio::test]
async fn integration_two_factor_recovery_resolves_username_through_discover() {
    let server = MockServer::start_async().await;
    let discover = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/internal/discover")
            .query_param("username", "jane");
        then.status(200)
            .json_body(json!({"id": 3, "username": "jane", "name": "Jane"}));
    });
    let codes = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/internal/two_factor_recovery_codes")
            .json_body(json!({"user_id": 3}));
        then.status(200).json_body(json!({
            "success": true,
            "recovery_codes": ["alpha", "bravo"]
        }));
    });
    let config = GatewayConfig::new(server.base_url(), "integration-secret");

    let session = run_session(
        &["username-jane"],
        "2fa_recovery_codes",
        &config,
        Arc::default(),
        "yes\n",
    )
    .await;

    assert_eq!(session.result.expect("dialog must succeed"), 0);
    discover.assert_calls(1);
    codes.assert_calls(1);
    assert!(session
        .out
        .contains("Your two-factor authentication recovery codes are:\n\nalpha\nbravo\n"));
}
