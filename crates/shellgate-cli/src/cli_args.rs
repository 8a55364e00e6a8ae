use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "gitlab-shell",
    about = "SSH forced-command gateway for GitLab git operations",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "GITLAB_SHELL_DIR",
        help = "Directory holding config.yml and the shared secret. Defaults to the parent of the executable's directory."
    )]
    pub config_dir: Option<PathBuf>,

    /// Forced-command arguments from authorized_keys, e.g. `key-42`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    pub fn root_dir(&self) -> Result<PathBuf> {
        if let Some(config_dir) = &self.config_dir {
            return Ok(config_dir.clone());
        }
        let executable =
            std::env::current_exe().context("failed to resolve the executable path")?;
        root_dir_for_executable(&executable)
    }
}

/// `<root>/bin/gitlab-shell` resolves to `<root>`.
pub fn root_dir_for_executable(executable: &Path) -> Result<PathBuf> {
    executable
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .with_context(|| {
            format!(
                "executable '{}' has no grandparent directory",
                executable.display()
            )
        })
}
