//! SSH command tokenization and identity resolution.
//!
//! Turns the SSH daemon's raw original command and the forced-command
//! arguments into a [`CommandArgs`] value that downstream commands consume.

pub mod command_args;
pub mod shellsplit;

pub use command_args::{CommandArgs, CommandType, SshEnvironment};
pub use shellsplit::split_ssh_args;
