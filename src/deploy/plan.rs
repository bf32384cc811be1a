//! Deployment plan construction
//!
//! A plan is an ordered list of shell fragments, built fresh for each
//! attempt and joined into one fail-fast invocation by the runner. Plan
//! construction is pure: it never inspects remote state, so the clone
//! decision must already be made (this keeps the decision and the
//! execution from racing within one run).

use crate::ssh::shell_quote;

/// How to reconcile the target directory with the desired checkout.
/// Decided before plan construction from remote inspection and, where
/// needed, user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneChoice {
    /// Target is empty: clone directly, no conditional
    Direct,
    /// Delete the target first, then clone
    Fresh,
    /// Reuse the existing checkout; no clone or pull
    Keep,
    /// Conditional pull-or-clone, as used in the published workflow
    PullOrClone,
}

/// Inputs that fully determine a plan.
#[derive(Debug, Clone)]
pub struct PlanOptions<'a> {
    pub repo_url: &'a str,
    pub target_path: &'a str,
    pub branch: &'a str,
    pub composer_flags: &'a str,
    pub run_migrations: bool,
    pub storage_link: bool,
}

/// Build the ordered command list for one deployment attempt.
///
/// Deterministic: identical inputs always yield the identical list. The
/// directory-setup fragments (`mkdir -p`, `rm -rf`) are idempotent, so
/// re-running the joined invocation after a mid-plan failure is safe.
pub fn build_deployment_commands(opts: &PlanOptions, choice: CloneChoice) -> Vec<String> {
    let target = shell_quote(opts.target_path);
    let url = shell_quote(opts.repo_url);
    let branch = shell_quote(opts.branch);

    let mut commands = Vec::new();

    if choice == CloneChoice::Fresh {
        commands.push(format!("rm -rf {target}"));
    }

    commands.push(format!("mkdir -p {target}"));
    commands.push(format!("cd {target}"));
    // The public-facing symlink is recreated below once the checkout is
    // in place; a stale one would shadow the new public directory.
    commands.push("rm -rf public_html".to_string());

    let clone = format!("git clone --branch {branch} {url} .");
    match choice {
        CloneChoice::Direct | CloneChoice::Fresh => commands.push(clone),
        CloneChoice::Keep => {}
        CloneChoice::PullOrClone => commands.push(format!(
            "if [ -d .git ]; then git pull origin {branch}; else {clone}; fi"
        )),
    }

    commands.push(format!("composer install {}", opts.composer_flags));
    commands.push(
        "if [ -f .env.example ] && [ ! -f .env ]; then cp .env.example .env; fi".to_string(),
    );
    commands.push("if [ -d public ]; then ln -sfn public public_html; fi".to_string());
    // APP_KEY is generated once; an existing value is never rotated
    commands.push(
        "if ! grep -q '^APP_KEY=..*' .env 2>/dev/null; then php artisan key:generate --force; fi"
            .to_string(),
    );

    if opts.run_migrations {
        commands.push("php artisan migrate --force".to_string());
    }
    if opts.storage_link {
        commands.push("php artisan storage:link --force".to_string());
    }

    commands
}
