pub mod auth;
pub mod cli;
pub mod credentials;
pub mod logging;
pub mod resource_cli;

pub use cli::{dispatch, run, Cli, Operation};
pub use resource_cli::{execute_resource, run_resource, ResourceCli, ResourceOperation};
