use shellgate_core::{GatewayError, ReadWriter};
use shellgate_gitaly::{
    proxy_receive_pack, GitalyTarget, ReceivePackConnector, Repository, SshReceivePackRequest,
};
use shellgate_gitlabnet::AccessVerifierResponse;
use tokio::sync::watch;

pub struct ReceivePack<'a> {
    connector: &'a dyn ReceivePackConnector,
}

impl<'a> ReceivePack<'a> {
    pub fn new(connector: &'a dyn ReceivePackConnector) -> Self {
        Self { connector }
    }

    pub async fn run(
        &self,
        response: &AccessVerifierResponse,
        read_writer: &mut ReadWriter<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<i32, GatewayError> {
        let target = GitalyTarget {
            address: response.gitaly.address.clone(),
            token: response.gitaly.token.clone(),
        };
        tracing::debug!(
            address = %target.address,
            repo = %response.repo,
            "proxying receive-pack"
        );
        proxy_receive_pack(
            self.connector,
            &target,
            header_request(response),
            read_writer,
            cancel,
        )
        .await
    }
}

/// First stream frame describing the repository and the pushing user.
pub fn header_request(response: &AccessVerifierResponse) -> SshReceivePackRequest {
    let repo = &response.gitaly.repo;
    SshReceivePackRequest {
        repository: Some(Repository {
            storage_name: repo.storage_name.clone(),
            relative_path: repo.relative_path.clone(),
            git_object_directory: repo.git_object_directory.clone(),
            git_alternate_object_directories: repo.git_alternate_object_directories.clone(),
            gl_repository: repo.repo_name.clone(),
            gl_project_path: repo.project_path.clone(),
        }),
        stdin: Vec::new(),
        gl_id: response.user_id.clone(),
        gl_repository: response.repo.clone(),
        gl_username: response.username.clone(),
        git_protocol: response.git_protocol.clone(),
        git_config_options: response.git_config_options.clone(),
    }
}
