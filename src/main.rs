//! Gangplank CLI - deploy Laravel apps to shared hosting over SSH
//!
//! Usage: gangplank <COMMAND>
//!
//! Commands:
//!   deploy    Deploy the current repository to the server
//!   setup     Wire the repository up to GitHub Actions
//!   workflow  Render the deployment workflow file
//!   check     Pre-flight checks

mod cli;
mod commands;
mod ui;

use clap::Parser;

use cli::{Cli, Commands};
use gangplank::{Config, DeployError, DeployMode};

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = run(cli);
    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            ui::report_error(&err, verbose);
            std::process::exit(match err {
                DeployError::Cancelled => 130,
                _ => 1,
            });
        }
    }
}

fn run(cli: Cli) -> Result<i32, DeployError> {
    match cli.command {
        Commands::Deploy {
            target,
            fresh,
            skip_git,
            migrate,
        } => {
            let mut config = Config::from_env();
            target.apply(&mut config);
            if migrate {
                config.run_migrations = true;
            }
            let mode = if fresh {
                DeployMode::ForceFresh
            } else if skip_git {
                DeployMode::SkipGit
            } else {
                DeployMode::Auto
            };
            commands::deploy::cmd_deploy(&config, mode, cli.yes)?;
            Ok(0)
        }

        Commands::Setup {
            target,
            branch,
            php_version,
            identity,
        } => {
            let mut config = Config::from_env();
            target.apply(&mut config);
            if let Some(version) = php_version {
                config.php_version = version;
            }
            if let Some(identity) = identity {
                config.identity_file = identity;
            }
            commands::setup::cmd_setup(&config, branch.as_deref(), cli.yes)?;
            Ok(0)
        }

        Commands::Workflow {
            push,
            branch,
            php_version,
            token,
        } => {
            let mut config = Config::from_env();
            if let Some(version) = php_version {
                config.php_version = version;
            }
            if let Some(token) = token {
                config.github_token = Some(token);
            }
            commands::workflow::cmd_workflow(&config, push, branch.as_deref())?;
            Ok(0)
        }

        Commands::Check { target } => {
            let mut config = Config::from_env();
            target.apply(&mut config);
            let healthy = commands::check::cmd_check(&config)?;
            Ok(if healthy { 0 } else { 1 })
        }
    }
}
