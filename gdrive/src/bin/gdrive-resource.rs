use clap::Parser;
use gdrive::cli::{finish, parse_error_exit};
use gdrive::logging::init_tracing;
use gdrive::resource_cli::{run_resource, ResourceCli};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = match ResourceCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return parse_error_exit(e),
    };
    finish(run_resource(cli).await)
}
