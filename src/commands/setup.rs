//! `gangplank setup` - wire the repository up to GitHub Actions
//!
//! Registers the server's deploy key, creates the Actions secrets and
//! variables the workflow consumes, and publishes the workflow file
//! through the contents API.

use gangplank::{
    deploy_key_registered, render_workflow, CiProvider, Config, ConfigScope, DeployResult,
    GithubClient, Orchestrator, RemoteShell, SshRunner,
};

use crate::ui;

pub fn cmd_setup(config: &Config, branch: Option<&str>, yes: bool) -> DeployResult<()> {
    config.validate(ConfigScope::Setup)?;
    let repo = super::require_repo(config)?;
    let branch = branch.unwrap_or(&repo.branch);

    // validate() guarantees the token is present in Setup scope
    let token = config.github_token.as_deref().unwrap_or_default();
    let client = GithubClient::new(token, &repo.owner, &repo.name)?;
    let login = client.test_connection()?;
    ui::step(&format!("Authenticated with GitHub as {login}"));

    let runner = SshRunner::new(config.ssh.clone());
    runner.check_connection()?;
    ui::step(&format!("Connected to {}", config.ssh.destination()));

    // Deploy key: generate server-side if absent, register unless the
    // exact key material is already present (duplicates are rejected).
    let prompter = super::make_prompter(yes);
    let orchestrator = Orchestrator::new(&runner, prompter.as_ref(), Some(&client), config);
    let public_key = orchestrator.ensure_server_key()?;
    let keys = client.list_deploy_keys()?;
    if deploy_key_registered(&public_key, &keys) {
        ui::step("Deploy key already registered");
    } else {
        let title = format!("{}@{} (gangplank)", config.ssh.username, config.ssh.host);
        client.create_deploy_key(&title, &public_key, true)?;
        ui::success("Registered the server's deploy key");
    }

    client.put_secret("SSH_HOST", &config.ssh.host)?;
    client.put_secret("SSH_USERNAME", &config.ssh.username)?;
    match std::fs::read_to_string(config.identity_path()) {
        Ok(private_key) => {
            client.put_secret("SSH_PRIVATE_KEY", &private_key)?;
            // The workflow connects with this key, so its public half
            // must be authorized on the server.
            let pub_path = config.identity_path().with_extension("pub");
            match std::fs::read_to_string(&pub_path) {
                Ok(public_key) => {
                    runner.add_to_authorized_keys(&public_key)?;
                    ui::step("Authorized the local key on the server");
                }
                Err(err) => ui::warn(&format!(
                    "could not read {} ({err}); authorize the key on the server yourself",
                    pub_path.display()
                )),
            }
        }
        Err(err) => {
            // The rest of the wiring is still worth finishing; the user
            // can add this one secret by hand.
            ui::warn(&format!(
                "could not read {} ({err}); set the SSH_PRIVATE_KEY secret manually at {}",
                config.identity_path().display(),
                repo.secrets_url()
            ));
        }
    }
    ui::success("Actions secrets created (values sealed before upload)");

    client.set_variable("SSH_PORT", &config.ssh.port.to_string())?;
    client.set_variable("DEPLOY_PATH", &config.deploy_path)?;
    client.set_variable("PHP_VERSION", &config.php_version)?;
    ui::success("Actions variables created");

    let content = render_workflow(branch, &config.php_version);
    client.upsert_file(
        &config.workflow_path,
        &content,
        "Add deployment workflow",
        branch,
    )?;
    ui::success(&format!("Published {} on {branch}", config.workflow_path));

    println!();
    println!("Review the configuration:");
    println!("  secrets:     {}", repo.secrets_url());
    println!("  variables:   {}", repo.variables_url());
    println!("  deploy keys: {}", repo.deploy_keys_url());
    Ok(())
}
