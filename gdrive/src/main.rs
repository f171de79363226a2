use clap::Parser;
use gdrive::cli::{finish, parse_error_exit, run, Cli};
use gdrive::logging::init_tracing;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    init_tracing();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return parse_error_exit(e),
    };
    tracing::info!("CLI arguments parsed, invoking run");
    finish(run(cli).await)
}
