#![no_main]

use libfuzzer_sys::fuzz_target;
use shellgate_commandargs::{CommandArgs, CommandType, SshEnvironment};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (who, command) = raw.split_once('\n').unwrap_or((raw.as_ref(), ""));
    let arguments = who.split(' ').map(str::to_string).collect::<Vec<_>>();

    let args = CommandArgs::parse(&arguments, &SshEnvironment::ssh(command))
        .expect("ssh invocations always resolve");
    assert!(args.gitlab_key_id.is_none() || args.gitlab_username.is_none());
    if let Some(key_id) = &args.gitlab_key_id {
        assert!(!key_id.is_empty() && key_id.bytes().all(|byte| byte.is_ascii_digit()));
    }
    match args.ssh_args.first() {
        None => assert_eq!(args.command_type, CommandType::Discover),
        Some(verb) => assert_eq!(args.command_type.as_str(), verb),
    }
});
