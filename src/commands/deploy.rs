//! `gangplank deploy` - run one deployment against the server

use gangplank::{
    AuthFailureClassifier, CiProvider, CloneChoice, Config, ConfigScope, DeployMode, DeployResult,
    GithubClient, Orchestrator, SshRunner,
};

use crate::ui;

pub fn cmd_deploy(config: &Config, mode: DeployMode, yes: bool) -> DeployResult<()> {
    config.validate(ConfigScope::Deploy)?;
    let repo = super::require_repo(config)?;

    ui::step(&format!(
        "Deploying {} ({}) to {}:{}",
        repo.full_name(),
        repo.branch,
        config.ssh.host,
        config.deploy_path
    ));

    let runner = SshRunner::new(config.ssh.clone());
    runner.check_connection()?;

    // The GitHub client is optional here: without a token the key
    // remediation path falls back to a manual prompt. With one, the
    // credential is verified before the orchestrator can reach any
    // mutating call.
    let client = match config.github_token.as_deref() {
        Some(token) if !token.trim().is_empty() => {
            let client = GithubClient::new(token, &repo.owner, &repo.name)?;
            client.test_connection()?;
            Some(client)
        }
        _ => None,
    };
    let provider = client.as_ref().map(|c| c as &dyn CiProvider);

    let prompter = super::make_prompter(yes);
    let mut orchestrator = Orchestrator::new(&runner, prompter.as_ref(), provider, config);
    if let Some(patterns) = &config.auth_patterns {
        orchestrator = orchestrator.with_classifier(AuthFailureClassifier::new(patterns.clone()));
    }
    let report = orchestrator.run(&repo, mode)?;

    if report.auth_retries > 0 {
        ui::warn(&format!(
            "deploy key remediation was needed ({} retr{})",
            report.auth_retries,
            if report.auth_retries == 1 { "y" } else { "ies" }
        ));
    }
    let action = match report.choice {
        CloneChoice::Direct | CloneChoice::Fresh => "cloned",
        CloneChoice::Keep => "kept checkout of",
        CloneChoice::PullOrClone => "updated",
    };
    ui::success(&format!(
        "{action} {} in {} ({} steps)",
        repo.full_name(),
        config.deploy_path,
        report.commands.len()
    ));
    Ok(())
}
