//! Wire messages for `gitaly.SSHService/SSHReceivePack`.

pub const SSH_RECEIVE_PACK_PATH: &str = "/gitaly.SSHService/SSHReceivePack";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Repository {
    #[prost(string, tag = "2")]
    pub storage_name: String,
    #[prost(string, tag = "3")]
    pub relative_path: String,
    #[prost(string, tag = "4")]
    pub git_object_directory: String,
    #[prost(string, repeated, tag = "5")]
    pub git_alternate_object_directories: Vec<String>,
    #[prost(string, tag = "6")]
    pub gl_repository: String,
    #[prost(string, tag = "8")]
    pub gl_project_path: String,
}

#[derive(Clone, PartialEq, prost::Message)]
/// One client frame. Only the first frame carries the repository and
/// identity; later frames carry stdin only.
pub struct SshReceivePackRequest {
    #[prost(message, optional, tag = "1")]
    pub repository: Option<Repository>,
    #[prost(bytes = "vec", tag = "2")]
    pub stdin: Vec<u8>,
    #[prost(string, tag = "3")]
    pub gl_id: String,
    #[prost(string, tag = "4")]
    pub gl_repository: String,
    #[prost(string, tag = "5")]
    pub gl_username: String,
    #[prost(string, tag = "6")]
    pub git_protocol: String,
    #[prost(string, repeated, tag = "7")]
    pub git_config_options: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SshReceivePackResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub stdout: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub stderr: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub exit_status: Option<ExitStatus>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct ExitStatus {
    #[prost(int32, tag = "1")]
    pub value: i32,
}
