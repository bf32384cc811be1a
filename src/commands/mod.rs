//! Command implementations for the Gangplank binary

pub mod check;
pub mod deploy;
pub mod setup;
pub mod workflow;

use is_terminal::IsTerminal;

use gangplank::{AssumeDefaults, Config, DeployError, DeployResult, InteractivePrompter, Prompter, RepoInfo};

/// Pick the prompt strategy: interactive only when stdin is a real
/// terminal and the user did not pass `--yes`.
pub fn make_prompter(yes: bool) -> Box<dyn Prompter> {
    if yes || !std::io::stdin().is_terminal() {
        Box::new(AssumeDefaults)
    } else {
        Box::new(InteractivePrompter)
    }
}

/// Resolve the local repository or fail with a precondition message.
pub fn require_repo(config: &Config) -> DeployResult<RepoInfo> {
    let cwd = std::env::current_dir()?;
    RepoInfo::discover(&cwd, &config.default_branch).ok_or_else(|| DeployError::Config {
        missing: vec![
            "a Git repository with an 'origin' remote (run from the project root)".to_string(),
        ],
    })
}
