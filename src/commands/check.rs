//! `gangplank check` - pre-flight checks
//!
//! Reports on configuration, repository discovery, SSH connectivity and
//! GitHub authentication in one pass. Returns whether everything is
//! healthy; the caller turns `false` into a non-zero exit.

use gangplank::{Config, ConfigScope, DeployResult, GithubClient, RepoInfo, SshRunner};

pub fn cmd_check(config: &Config) -> DeployResult<bool> {
    let mut healthy = true;

    match config.validate(ConfigScope::Deploy) {
        Ok(()) => println!("✓ configuration complete"),
        Err(err) => {
            healthy = false;
            println!("✗ {err}");
        }
    }

    let cwd = std::env::current_dir()?;
    let repo = RepoInfo::discover(&cwd, &config.default_branch);
    match &repo {
        Some(repo) => println!("✓ repository {} on branch {}", repo.full_name(), repo.branch),
        None => {
            healthy = false;
            println!("✗ no Git repository with an 'origin' remote here");
        }
    }

    // Only probe the network for the parts that are configured; missing
    // values were already reported above.
    if !config.ssh.host.trim().is_empty() && !config.ssh.username.trim().is_empty() {
        let runner = SshRunner::new(config.ssh.clone());
        match runner.check_connection() {
            Ok(()) => println!("✓ SSH connection to {}", config.ssh.destination()),
            Err(err) => {
                healthy = false;
                println!("✗ {err}");
            }
        }
    }

    match (config.github_token.as_deref(), &repo) {
        (Some(token), Some(repo)) if !token.trim().is_empty() => {
            match GithubClient::new(token, &repo.owner, &repo.name)
                .and_then(|client| {
                    use gangplank::CiProvider;
                    client.test_connection()
                }) {
                Ok(login) => println!("✓ GitHub token valid (authenticated as {login})"),
                Err(err) => {
                    healthy = false;
                    println!("✗ {err}");
                }
            }
        }
        _ => println!("- GitHub token not set (setup and automatic key registration unavailable)"),
    }

    Ok(healthy)
}
