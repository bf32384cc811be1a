//! `gangplank workflow` - render the deployment workflow file
//!
//! Writes `.github/workflows/deploy.yml` into the working tree by
//! default; `--push` publishes it through the contents API instead.

use gangplank::{
    render_workflow, CiProvider, Config, ConfigScope, DeployError, DeployResult, GithubClient,
    RepoInfo,
};

use crate::ui;

pub fn cmd_workflow(config: &Config, push: bool, branch: Option<&str>) -> DeployResult<()> {
    config.validate(ConfigScope::Local)?;

    let cwd = std::env::current_dir()?;
    let repo = RepoInfo::discover(&cwd, &config.default_branch);

    // A repository is only a hard requirement when pushing; local
    // rendering falls back to the configured default branch.
    let branch = match (branch, &repo) {
        (Some(b), _) => b.to_string(),
        (None, Some(r)) => r.branch.clone(),
        (None, None) => config.default_branch.clone(),
    };

    let content = render_workflow(&branch, &config.php_version);

    if push {
        let repo = repo.ok_or_else(|| DeployError::Config {
            missing: vec![
                "a Git repository with an 'origin' remote (required for --push)".to_string(),
            ],
        })?;
        let token = config.github_token.as_deref().unwrap_or_default();
        if token.trim().is_empty() {
            return Err(DeployError::Config {
                missing: vec!["GitHub token (GANGPLANK_GITHUB_TOKEN or --token)".to_string()],
            });
        }
        let client = GithubClient::new(token, &repo.owner, &repo.name)?;
        client.test_connection()?;
        client.upsert_file(
            &config.workflow_path,
            &content,
            "Add deployment workflow",
            &branch,
        )?;
        ui::success(&format!(
            "Published {} to {} on {branch}",
            config.workflow_path,
            repo.full_name()
        ));
    } else {
        let written = gangplank::workflow::write_local(&cwd, &config.workflow_path, &content)?;
        ui::success(&format!("Wrote {}", written.display()));
    }
    Ok(())
}
