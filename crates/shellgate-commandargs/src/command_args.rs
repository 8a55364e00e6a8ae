use std::fmt;

use shellgate_core::GatewayError;

use crate::split_ssh_args;

const SSH_CONNECTION_ENV: &str = "SSH_CONNECTION";
const SSH_ORIGINAL_COMMAND_ENV: &str = "SSH_ORIGINAL_COMMAND";
const WHO_KEY_PREFIX: &str = "key-";
const WHO_USERNAME_PREFIX: &str = "username-";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Operation requested by the SSH client, keyed by the command verb.
pub enum CommandType {
    Discover,
    TwoFactorRecover,
    ReceivePack,
    /// A verb this gateway does not map; authorization decides its fate.
    Unknown(String),
}

impl CommandType {
    pub fn parse(verb: &str) -> Self {
        match verb {
            "discover" => Self::Discover,
            "2fa_recovery_codes" => Self::TwoFactorRecover,
            "git-receive-pack" => Self::ReceivePack,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Discover => "discover",
            Self::TwoFactorRecover => "2fa_recovery_codes",
            Self::ReceivePack => "git-receive-pack",
            Self::Unknown(verb) => verb.as_str(),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// SSH daemon-provided process environment.
pub struct SshEnvironment {
    pub connection: Option<String>,
    pub original_command: String,
}

impl SshEnvironment {
    pub fn from_env() -> Self {
        Self {
            connection: std::env::var(SSH_CONNECTION_ENV)
                .ok()
                .filter(|value| !value.is_empty()),
            original_command: std::env::var(SSH_ORIGINAL_COMMAND_ENV).unwrap_or_default(),
        }
    }

    pub fn ssh(original_command: impl Into<String>) -> Self {
        Self {
            connection: Some("1".to_string()),
            original_command: original_command.into(),
        }
    }

    pub fn is_ssh(&self) -> bool {
        self.connection.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Resolved identity and operation for one SSH invocation.
pub struct CommandArgs {
    pub gitlab_username: Option<String>,
    pub gitlab_key_id: Option<String>,
    pub ssh_args: Vec<String>,
    pub command_type: CommandType,
}

impl CommandArgs {
    /// Resolves the acting identity from `arguments` and the operation from
    /// the SSH original command.
    pub fn parse(arguments: &[String], environment: &SshEnvironment) -> Result<Self, GatewayError> {
        if !environment.is_ssh() {
            return Err(GatewayError::NotSsh);
        }

        let (gitlab_key_id, gitlab_username) = parse_who(arguments);
        let ssh_args = parse_command(&environment.original_command);
        let command_type = command_type_for(&ssh_args);
        tracing::debug!(
            command_type = command_type.as_str(),
            has_key_id = gitlab_key_id.is_some(),
            has_username = gitlab_username.is_some(),
            "resolved ssh command arguments"
        );

        Ok(Self {
            gitlab_username,
            gitlab_key_id,
            ssh_args,
            command_type,
        })
    }

    /// Builds arguments for an already-tokenized command with no identity.
    pub fn from_ssh_args(ssh_args: Vec<String>) -> Self {
        let command_type = command_type_for(&ssh_args);
        Self {
            gitlab_username: None,
            gitlab_key_id: None,
            ssh_args,
            command_type,
        }
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.gitlab_key_id = Some(key_id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.gitlab_username = Some(username.into());
        self
    }
}

fn command_type_for(ssh_args: &[String]) -> CommandType {
    match ssh_args.first() {
        Some(verb) => CommandType::parse(verb),
        None => CommandType::Discover,
    }
}

fn parse_command(command: &str) -> Vec<String> {
    let mut args = split_ssh_args(command);
    // Git for Windows 2.14 sends `git upload-pack` instead of `git-upload-pack`.
    if args.len() >= 2 && args[0] == "git" {
        let verb = args.remove(1);
        args[0] = format!("git-{verb}");
    }
    args
}

/// First argument carrying a key id or username wins.
fn parse_who(arguments: &[String]) -> (Option<String>, Option<String>) {
    for argument in arguments {
        if let Some(key_id) = try_parse_key_id(argument) {
            return (Some(key_id), None);
        }
        if let Some(username) = try_parse_username(argument) {
            return (None, Some(username));
        }
    }
    (None, None)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_space_byte(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

fn is_word_boundary(bytes: &[u8], position: usize) -> bool {
    let before = position
        .checked_sub(1)
        .and_then(|index| bytes.get(index))
        .is_some_and(|byte| is_word_byte(*byte));
    let after = bytes.get(position).is_some_and(|byte| is_word_byte(*byte));
    before != after
}

/// Matches `key-<digits>` delimited by word boundaries anywhere in `argument`.
fn try_parse_key_id(argument: &str) -> Option<String> {
    let bytes = argument.as_bytes();
    for (index, _) in argument.match_indices(WHO_KEY_PREFIX) {
        if !is_word_boundary(bytes, index) {
            continue;
        }
        let digits_start = index + WHO_KEY_PREFIX.len();
        let digits = bytes[digits_start..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count();
        let end = digits_start + digits;
        if digits > 0 && is_word_boundary(bytes, end) {
            return Some(argument[digits_start..end].to_string());
        }
    }
    None
}

/// Matches `username-<non-space>` delimited by word boundaries, taking the
/// longest value that still ends on a boundary.
fn try_parse_username(argument: &str) -> Option<String> {
    let bytes = argument.as_bytes();
    for (index, _) in argument.match_indices(WHO_USERNAME_PREFIX) {
        if !is_word_boundary(bytes, index) {
            continue;
        }
        let value_start = index + WHO_USERNAME_PREFIX.len();
        let run = bytes[value_start..]
            .iter()
            .take_while(|byte| !is_space_byte(**byte))
            .count();
        if let Some(length) = (1..=run)
            .rev()
            .find(|length| is_word_boundary(bytes, value_start + length))
        {
            return Some(argument[value_start..value_start + length].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn unit_parse_sets_discover_for_empty_command() {
        let parsed = CommandArgs::parse(&[], &SshEnvironment::ssh("")).expect("parse");
        assert_eq!(parsed.command_type, CommandType::Discover);
        assert!(parsed.ssh_args.is_empty());
        assert_eq!(parsed.gitlab_key_id, None);
        assert_eq!(parsed.gitlab_username, None);
    }

    #[test]
    fn unit_parse_finds_key_id_in_any_argument() {
        let parsed = CommandArgs::parse(&args(&["hello", "key-123"]), &SshEnvironment::ssh(""))
            .expect("parse");
        assert_eq!(parsed.gitlab_key_id.as_deref(), Some("123"));
        assert_eq!(parsed.gitlab_username, None);
    }

    #[test]
    fn unit_parse_finds_username_in_any_argument() {
        let parsed = CommandArgs::parse(
            &args(&["hello", "username-jane-doe"]),
            &SshEnvironment::ssh(""),
        )
        .expect("parse");
        assert_eq!(parsed.gitlab_username.as_deref(), Some("jane-doe"));
        assert_eq!(parsed.gitlab_key_id, None);
    }

    #[test]
    fn unit_parse_who_first_match_wins() {
        let parsed = CommandArgs::parse(
            &args(&["key-123", "username-jane"]),
            &SshEnvironment::ssh(""),
        )
        .expect("parse");
        assert_eq!(parsed.gitlab_key_id.as_deref(), Some("123"));
        assert_eq!(parsed.gitlab_username, None);

        let parsed = CommandArgs::parse(
            &args(&["username-jane", "key-123"]),
            &SshEnvironment::ssh(""),
        )
        .expect("parse");
        assert_eq!(parsed.gitlab_username.as_deref(), Some("jane"));
        assert_eq!(parsed.gitlab_key_id, None);
    }

    #[test]
    fn unit_parse_recognizes_two_factor_recovery() {
        let parsed = CommandArgs::parse(&[], &SshEnvironment::ssh("2fa_recovery_codes"))
            .expect("parse");
        assert_eq!(parsed.command_type, CommandType::TwoFactorRecover);
        assert_eq!(parsed.ssh_args, args(&["2fa_recovery_codes"]));
    }

    #[test]
    fn unit_parse_canonicalizes_legacy_two_word_git_command() {
        let legacy = CommandArgs::parse(&[], &SshEnvironment::ssh("git receive-pack 'group/repo'"))
            .expect("parse legacy");
        let direct = CommandArgs::parse(&[], &SshEnvironment::ssh("git-receive-pack group/repo"))
            .expect("parse direct");
        assert_eq!(legacy.ssh_args, args(&["git-receive-pack", "group/repo"]));
        assert_eq!(legacy.command_type, CommandType::ReceivePack);
        assert_eq!(legacy, direct);
    }

    #[test]
    fn unit_parse_passes_unknown_verbs_through() {
        let parsed = CommandArgs::parse(&[], &SshEnvironment::ssh("git-frobnicate group/repo"))
            .expect("parse");
        assert_eq!(
            parsed.command_type,
            CommandType::Unknown("git-frobnicate".to_string())
        );
        assert_eq!(parsed.command_type.as_str(), "git-frobnicate");
    }

    #[test]
    fn regression_parse_rejects_missing_ssh_connection() {
        let error = CommandArgs::parse(&[], &SshEnvironment::default()).expect_err("not ssh");
        assert!(matches!(error, GatewayError::NotSsh));
        assert_eq!(error.to_string(), "Only SSH allowed");
    }

    #[test]
    fn regression_parse_keeps_lone_git_word() {
        let parsed = CommandArgs::parse(&[], &SshEnvironment::ssh("git")).expect("parse");
        assert_eq!(parsed.ssh_args, args(&["git"]));
        assert_eq!(parsed.command_type, CommandType::Unknown("git".to_string()));
    }

    #[test]
    fn unit_try_parse_key_id_requires_word_boundaries() {
        assert_eq!(try_parse_key_id("key-42"), Some("42".to_string()));
        assert_eq!(
            try_parse_key_id("command=\"gitlab-shell key-7\""),
            Some("7".to_string())
        );
        assert_eq!(try_parse_key_id("monkey-42"), None);
        assert_eq!(try_parse_key_id("key-42abc"), None);
        assert_eq!(try_parse_key_id("key-"), None);
        assert_eq!(try_parse_key_id("key-x key-9"), Some("9".to_string()));
    }

    #[test]
    fn unit_try_parse_username_trims_to_word_boundary() {
        assert_eq!(
            try_parse_username("username-jane-doe"),
            Some("jane-doe".to_string())
        );
        assert_eq!(try_parse_username("username-jane."), Some("jane".to_string()));
        assert_eq!(
            try_parse_username("username-jane other"),
            Some("jane".to_string())
        );
        assert_eq!(try_parse_username("myusername-jane"), None);
        assert_eq!(try_parse_username("username-"), None);
    }

    #[test]
    fn unit_from_ssh_args_resolves_command_type() {
        let parsed = CommandArgs::from_ssh_args(args(&["git-receive-pack", "group/repo"]))
            .with_key_id("1");
        assert_eq!(parsed.command_type, CommandType::ReceivePack);
        assert_eq!(parsed.gitlab_key_id.as_deref(), Some("1"));
    }
}
