//! Process entry support for the `gitlab-shell` binary.

pub mod bootstrap;
pub mod cli_args;
pub mod runner;

pub use bootstrap::{default_level, init_tracing, spawn_shutdown_watch};
pub use cli_args::{root_dir_for_executable, Cli};
pub use runner::execute;
