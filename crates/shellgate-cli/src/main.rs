use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use shellgate_cli::{execute, init_tracing, spawn_shutdown_watch, Cli};
use shellgate_commandargs::SshEnvironment;
use shellgate_core::{load_config, ReadWriter};
use tokio::io::{AsyncWriteExt, BufReader};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_main(cli) {
        Ok(exit_code) => ExitCode::from(u8::try_from(exit_code).unwrap_or(1)),
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_main(cli: Cli) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run_cli(cli));
    // A cancelled session may leave a blocking stdin read behind.
    runtime.shutdown_background();
    result
}

async fn run_cli(cli: Cli) -> Result<i32> {
    let root_dir = cli.root_dir()?;
    let config = load_config(&root_dir).context("failed to load gitlab-shell configuration")?;
    init_tracing(&config.log_level);

    let environment = SshEnvironment::from_env();
    let cancel = spawn_shutdown_watch();

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let mut stdin = BufReader::new(tokio::io::stdin());
    let result = {
        let mut read_writer = ReadWriter::new(&mut stdout, &mut stderr, &mut stdin);
        execute(&cli.args, &environment, &config, &mut read_writer, cancel).await
    };
    stdout.flush().await?;

    Ok(result?)
}
