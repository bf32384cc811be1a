//! Gangplank - deploy Laravel apps to shared hosting over SSH
//!
//! Gangplank drives a linear deployment over plain `ssh` (clone or pull,
//! composer install, artisan maintenance) and can wire the repository up
//! to GitHub Actions: deploy key, sealed secrets, workflow file.

pub mod config;
pub mod deploy;
pub mod error;
pub mod github;
pub mod prompt;
pub mod repo;
pub mod ssh;
pub mod workflow;

// Re-exports for convenience
pub use config::{Config, ConfigScope, SshConfig};
pub use deploy::{
    build_deployment_commands, AuthFailureClassifier, CloneChoice, DeployMode, DeployReport,
    Orchestrator, PlanOptions,
};
pub use error::{DeployError, DeployResult};
pub use github::{deploy_key_registered, CiProvider, DeployKey, GithubClient};
pub use prompt::{AssumeDefaults, ForeignChoice, InteractivePrompter, Prompter, ReconcileChoice};
pub use repo::RepoInfo;
pub use ssh::{shell_quote, RemoteShell, SshRunner};
pub use workflow::render_workflow;
