//! Deployment orchestrator
//!
//! One deployment attempt walks: decide clone mode → build plan →
//! execute → classify failures → bounded key remediation. All
//! collaborators come in through seams (`RemoteShell`, `Prompter`,
//! optional `CiProvider`) so the decision logic runs under test without
//! a server, a terminal, or the GitHub API.

pub mod classify;
pub mod plan;

pub use classify::AuthFailureClassifier;
pub use plan::{build_deployment_commands, CloneChoice, PlanOptions};

use crate::config::Config;
use crate::error::{DeployError, DeployResult};
use crate::github::{self, CiProvider};
use crate::prompt::{ForeignChoice, Prompter, ReconcileChoice};
use crate::repo::RepoInfo;
use crate::ssh::{shell_quote, RemoteShell};

/// Retries after the initial auth failure; the 3rd failed remediation is
/// terminal.
const MAX_AUTH_RETRIES: u32 = 3;

/// How the CLI asked the clone decision to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    /// Inspect the target and prompt where ambiguous
    #[default]
    Auto,
    /// Delete-and-clone unconditionally, no inspection
    ForceFresh,
    /// Reuse the existing checkout, run only install and maintenance steps
    SkipGit,
}

/// What one successful run did, for reporting.
#[derive(Debug)]
pub struct DeployReport {
    pub choice: CloneChoice,
    pub commands: Vec<String>,
    /// Key remediation rounds that were needed (0 on a clean run)
    pub auth_retries: u32,
}

pub struct Orchestrator<'a> {
    shell: &'a dyn RemoteShell,
    prompter: &'a dyn Prompter,
    provider: Option<&'a dyn CiProvider>,
    config: &'a Config,
    classifier: AuthFailureClassifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        shell: &'a dyn RemoteShell,
        prompter: &'a dyn Prompter,
        provider: Option<&'a dyn CiProvider>,
        config: &'a Config,
    ) -> Self {
        Self {
            shell,
            prompter,
            provider,
            config,
            classifier: AuthFailureClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: AuthFailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run one deployment of `repo` into the configured target path.
    pub fn run(&self, repo: &RepoInfo, mode: DeployMode) -> DeployResult<DeployReport> {
        let choice = self.decide_clone_choice(mode)?;
        let options = PlanOptions {
            repo_url: &repo.remote_url,
            target_path: &self.config.deploy_path,
            branch: &repo.branch,
            composer_flags: &self.config.composer_flags,
            run_migrations: self.config.run_migrations,
            storage_link: self.config.storage_link,
        };
        let commands = build_deployment_commands(&options, choice);
        let auth_retries = self.execute_with_remediation(&commands, repo)?;

        Ok(DeployReport {
            choice,
            commands,
            auth_retries,
        })
    }

    /// Inspect the remote target and settle the clone choice before any
    /// plan exists. Empty targets never prompt; non-empty ones always do
    /// (in `Auto` mode) - the orchestrator never deletes silently.
    pub fn decide_clone_choice(&self, mode: DeployMode) -> DeployResult<CloneChoice> {
        match mode {
            DeployMode::ForceFresh => return Ok(CloneChoice::Fresh),
            DeployMode::SkipGit => return Ok(CloneChoice::Keep),
            DeployMode::Auto => {}
        }

        let path = &self.config.deploy_path;
        if !self.shell.directory_exists(path)? || self.shell.directory_is_empty(path)? {
            return Ok(CloneChoice::Direct);
        }

        if self.target_holds_app()? {
            match self.prompter.reconcile_existing(path)? {
                ReconcileChoice::Replace => Ok(CloneChoice::Fresh),
                // Keep-and-continue still refreshes the checkout
                ReconcileChoice::Keep => Ok(CloneChoice::PullOrClone),
            }
        } else {
            match self.prompter.reconcile_foreign(path)? {
                ForeignChoice::Replace => Ok(CloneChoice::Fresh),
                ForeignChoice::Abort => Err(DeployError::Cancelled),
            }
        }
    }

    /// Recognizable checkout: an `artisan` entry point plus a dependency
    /// manifest that references the expected framework.
    fn target_holds_app(&self) -> DeployResult<bool> {
        let path = &self.config.deploy_path;
        if !self.shell.file_exists(&format!("{path}/artisan"))? {
            return Ok(false);
        }
        let manifest = shell_quote(&format!("{path}/composer.json"));
        let out = self.shell.execute(&format!(
            "grep -q laravel/framework {manifest} 2>/dev/null && echo yes || echo no"
        ))?;
        Ok(out.trim() == "yes")
    }

    /// Execute the plan, remediating authentication failures up to
    /// `MAX_AUTH_RETRIES` times. Returns the number of retries used.
    fn execute_with_remediation(&self, commands: &[String], repo: &RepoInfo) -> DeployResult<u32> {
        let mut retries = 0;
        loop {
            match self.shell.execute_many(commands) {
                Ok(_) => return Ok(retries),
                Err(err) if self.classifier.is_auth_failure(&err) => {
                    if retries >= MAX_AUTH_RETRIES {
                        return Err(err);
                    }
                    retries += 1;
                    self.remediate_auth(repo)?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Make the server's deploy key usable: generate it if absent, then
    /// either confirm/register it with the provider or fall back to a
    /// manual prompt when no CI client is available.
    fn remediate_auth(&self, repo: &RepoInfo) -> DeployResult<()> {
        let public_key = self.ensure_server_key()?;

        match self.provider {
            Some(provider) => {
                let keys = provider.list_deploy_keys()?;
                if github::deploy_key_registered(&public_key, &keys) {
                    // Already registered: a plain retry is all that's left
                    return Ok(());
                }
                let title = format!(
                    "{}@{} (gangplank)",
                    self.config.ssh.username, self.config.ssh.host
                );
                match provider.create_deploy_key(&title, &public_key, true) {
                    Ok(()) => Ok(()),
                    // Token without repo admin rights: the key can still
                    // be registered by hand
                    Err(DeployError::Provider { .. }) => {
                        self.manual_key_fallback(&public_key, repo)
                    }
                    Err(err) => Err(err),
                }
            }
            None => self.manual_key_fallback(&public_key, repo),
        }
    }

    fn manual_key_fallback(&self, public_key: &str, repo: &RepoInfo) -> DeployResult<()> {
        if self
            .prompter
            .confirm_key_installed(public_key, &repo.deploy_keys_url())?
        {
            Ok(())
        } else {
            Err(DeployError::Cancelled)
        }
    }

    /// Read the server's public key, generating the pair first if the
    /// server has none.
    pub fn ensure_server_key(&self) -> DeployResult<String> {
        if !self.shell.ssh_key_exists()? {
            let comment = format!("deploy@{}", self.config.ssh.host);
            self.shell.generate_ssh_key(&comment)?;
        }
        self.shell.read_public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SshConfig;
    use crate::github::DeployKey;
    use std::cell::RefCell;

    const AUTH_STDERR: &str = "git@github.com: Permission denied (publickey).";

    fn test_config() -> Config {
        Config {
            ssh: SshConfig {
                host: "s1.example-hosting.com".into(),
                username: "u1".into(),
                port: 22,
                timeout_secs: 30,
            },
            deploy_path: "/home/u1/domains/example.com".into(),
            ..Config::default()
        }
    }

    fn test_repo() -> RepoInfo {
        RepoInfo {
            host: "github.com".into(),
            owner: "owner".into(),
            name: "app".into(),
            branch: "main".into(),
            remote_url: "git@github.com:owner/app.git".into(),
        }
    }

    fn auth_failure() -> DeployError {
        DeployError::RemoteExec {
            command: "git clone".into(),
            exit_code: 128,
            stdout: String::new(),
            stderr: AUTH_STDERR.into(),
        }
    }

    /// Scripted transport: replays results in order, then succeeds.
    struct ScriptedShell {
        executed: RefCell<Vec<String>>,
        results: RefCell<Vec<DeployResult<String>>>,
    }

    impl ScriptedShell {
        fn new(results: Vec<DeployResult<String>>) -> Self {
            Self {
                executed: RefCell::new(Vec::new()),
                results: RefCell::new(results),
            }
        }

        fn count_executed(&self, needle: &str) -> usize {
            self.executed
                .borrow()
                .iter()
                .filter(|c| c.contains(needle))
                .count()
        }
    }

    impl RemoteShell for ScriptedShell {
        fn execute(&self, command: &str) -> DeployResult<String> {
            self.executed.borrow_mut().push(command.to_string());
            if self.results.borrow().is_empty() {
                Ok(String::new())
            } else {
                self.results.borrow_mut().remove(0)
            }
        }
    }

    /// Prompter double with canned answers; records whether it was asked.
    struct ScriptedPrompter {
        existing: ReconcileChoice,
        foreign: ForeignChoice,
        key_installed: bool,
        asked: RefCell<Vec<&'static str>>,
    }

    impl ScriptedPrompter {
        fn new() -> Self {
            Self {
                existing: ReconcileChoice::Keep,
                foreign: ForeignChoice::Abort,
                key_installed: false,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn reconcile_existing(&self, _path: &str) -> DeployResult<ReconcileChoice> {
            self.asked.borrow_mut().push("existing");
            Ok(self.existing)
        }

        fn reconcile_foreign(&self, _path: &str) -> DeployResult<ForeignChoice> {
            self.asked.borrow_mut().push("foreign");
            Ok(self.foreign)
        }

        fn confirm_key_installed(&self, _key: &str, _url: &str) -> DeployResult<bool> {
            self.asked.borrow_mut().push("key");
            Ok(self.key_installed)
        }
    }

    /// Provider double recording mutations.
    struct FakeProvider {
        keys: Vec<DeployKey>,
        created: RefCell<Vec<String>>,
        reject_created: bool,
    }

    impl FakeProvider {
        fn new(keys: Vec<DeployKey>) -> Self {
            Self {
                keys,
                created: RefCell::new(Vec::new()),
                reject_created: false,
            }
        }

        fn rejecting(keys: Vec<DeployKey>) -> Self {
            Self {
                keys,
                created: RefCell::new(Vec::new()),
                reject_created: true,
            }
        }
    }

    impl CiProvider for FakeProvider {
        fn test_connection(&self) -> DeployResult<String> {
            Ok("owner".into())
        }

        fn put_secret(&self, _name: &str, _plaintext: &str) -> DeployResult<()> {
            Ok(())
        }

        fn set_variable(&self, _name: &str, _value: &str) -> DeployResult<()> {
            Ok(())
        }

        fn upsert_file(&self, _: &str, _: &str, _: &str, _: &str) -> DeployResult<()> {
            Ok(())
        }

        fn list_deploy_keys(&self) -> DeployResult<Vec<DeployKey>> {
            Ok(self.keys.clone())
        }

        fn create_deploy_key(&self, _title: &str, key: &str, _read_only: bool) -> DeployResult<()> {
            self.created.borrow_mut().push(key.to_string());
            if self.reject_created {
                return Err(DeployError::provider(403, "admin rights required"));
            }
            Ok(())
        }
    }

    #[test]
    fn empty_target_clones_directly_without_prompting() {
        // directory_exists -> exists, directory_is_empty -> empty
        let shell = ScriptedShell::new(vec![
            Ok("exists\n".into()),
            Ok("empty\n".into()),
        ]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        let choice = orchestrator.decide_clone_choice(DeployMode::Auto).unwrap();
        assert_eq!(choice, CloneChoice::Direct);
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn missing_target_clones_directly() {
        let shell = ScriptedShell::new(vec![Ok("not_exists\n".into())]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        assert_eq!(
            orchestrator.decide_clone_choice(DeployMode::Auto).unwrap(),
            CloneChoice::Direct
        );
    }

    #[test]
    fn force_fresh_skips_inspection_entirely() {
        let shell = ScriptedShell::new(vec![]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        assert_eq!(
            orchestrator.decide_clone_choice(DeployMode::ForceFresh).unwrap(),
            CloneChoice::Fresh
        );
        assert!(shell.executed.borrow().is_empty());
    }

    #[test]
    fn recognizable_checkout_offers_replace_or_keep() {
        // exists, not empty, artisan exists, manifest references framework
        let shell = ScriptedShell::new(vec![
            Ok("exists\n".into()),
            Ok("not_empty\n".into()),
            Ok("exists\n".into()),
            Ok("yes\n".into()),
        ]);
        let mut prompter = ScriptedPrompter::new();
        prompter.existing = ReconcileChoice::Keep;
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        assert_eq!(
            orchestrator.decide_clone_choice(DeployMode::Auto).unwrap(),
            CloneChoice::PullOrClone
        );
        assert_eq!(*prompter.asked.borrow(), vec!["existing"]);
    }

    #[test]
    fn recognizable_checkout_replace_means_fresh() {
        let shell = ScriptedShell::new(vec![
            Ok("exists\n".into()),
            Ok("not_empty\n".into()),
            Ok("exists\n".into()),
            Ok("yes\n".into()),
        ]);
        let mut prompter = ScriptedPrompter::new();
        prompter.existing = ReconcileChoice::Replace;
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        assert_eq!(
            orchestrator.decide_clone_choice(DeployMode::Auto).unwrap(),
            CloneChoice::Fresh
        );
    }

    #[test]
    fn foreign_directory_aborts_rather_than_proceeding() {
        // exists, not empty, no artisan file
        let shell = ScriptedShell::new(vec![
            Ok("exists\n".into()),
            Ok("not_empty\n".into()),
            Ok("not_exists\n".into()),
        ]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        let err = orchestrator.decide_clone_choice(DeployMode::Auto).unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));
        assert_eq!(*prompter.asked.borrow(), vec!["foreign"]);
    }

    #[test]
    fn artisan_without_framework_reference_is_foreign() {
        let shell = ScriptedShell::new(vec![
            Ok("exists\n".into()),
            Ok("not_empty\n".into()),
            Ok("exists\n".into()),
            Ok("no\n".into()),
        ]);
        let mut prompter = ScriptedPrompter::new();
        prompter.foreign = ForeignChoice::Replace;
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        assert_eq!(
            orchestrator.decide_clone_choice(DeployMode::Auto).unwrap(),
            CloneChoice::Fresh
        );
    }

    #[test]
    fn auth_failure_with_registered_key_retries_plainly() {
        // execute_many fails once with auth error, then: key exists,
        // read key, retry succeeds
        let shell = ScriptedShell::new(vec![
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB deploy@server\n".into()),
            Ok(String::new()),
        ]);
        let prompter = ScriptedPrompter::new();
        let provider = FakeProvider::new(vec![DeployKey {
            id: 7,
            title: "server".into(),
            key: "ssh-ed25519 AAAB".into(),
            read_only: true,
        }]);
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, Some(&provider), &config);

        let retries = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap();
        assert_eq!(retries, 1);
        assert!(provider.created.borrow().is_empty());
    }

    #[test]
    fn auth_failure_registers_missing_key_then_retries() {
        // fail, no server key yet -> generate, read, register, retry ok
        let shell = ScriptedShell::new(vec![
            Err(auth_failure()),
            Ok("not_exists\n".into()),
            Ok(String::new()), // ssh-keygen
            Ok("ssh-ed25519 AAAB deploy@server\n".into()),
            Ok(String::new()),
        ]);
        let prompter = ScriptedPrompter::new();
        let provider = FakeProvider::new(vec![]);
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, Some(&provider), &config);

        let retries = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap();
        assert_eq!(retries, 1);
        assert_eq!(
            *provider.created.borrow(),
            vec!["ssh-ed25519 AAAB deploy@server".to_string()]
        );
        assert_eq!(shell.count_executed("ssh-keygen"), 1);
    }

    #[test]
    fn custom_classifier_patterns_drive_remediation() {
        // Localized transport output that the default list misses
        let failure = DeployError::RemoteExec {
            command: "git clone".into(),
            exit_code: 128,
            stdout: String::new(),
            stderr: "Zugriff verweigert (publickey)".into(),
        };
        let shell = ScriptedShell::new(vec![
            Err(failure),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB\n".into()),
            Ok(String::new()),
        ]);
        let prompter = ScriptedPrompter {
            key_installed: true,
            ..ScriptedPrompter::new()
        };
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config)
            .with_classifier(AuthFailureClassifier::new(vec!["zugriff verweigert".into()]));

        let retries = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap();
        assert_eq!(retries, 1);
        assert_eq!(*prompter.asked.borrow(), vec!["key"]);
    }

    #[test]
    fn rejected_key_registration_falls_back_to_manual_confirmation() {
        let shell = ScriptedShell::new(vec![
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB deploy@server\n".into()),
            Ok(String::new()),
        ]);
        let prompter = ScriptedPrompter {
            key_installed: true,
            ..ScriptedPrompter::new()
        };
        let provider = FakeProvider::rejecting(vec![]);
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, Some(&provider), &config);

        let retries = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap();
        assert_eq!(retries, 1);
        assert_eq!(*prompter.asked.borrow(), vec!["key"]);
    }

    #[test]
    fn persistent_auth_failure_stops_after_three_retries() {
        // Every execute_many attempt fails with the same auth error; the
        // predicate/key reads in between succeed.
        let shell = ScriptedShell::new(vec![
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB\n".into()),
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB\n".into()),
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB\n".into()),
            Err(auth_failure()),
        ]);
        let prompter = ScriptedPrompter::new();
        let provider = FakeProvider::new(vec![DeployKey {
            id: 7,
            title: "server".into(),
            key: "ssh-ed25519 AAAB".into(),
            read_only: true,
        }]);
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, Some(&provider), &config);

        let err = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap_err();
        assert!(matches!(err, DeployError::RemoteExec { .. }));
        // 1 initial + 3 remediated retries, never a 4th retry
        assert_eq!(shell.count_executed("git clone"), 4);
    }

    #[test]
    fn without_provider_manual_decline_cancels() {
        let shell = ScriptedShell::new(vec![
            Err(auth_failure()),
            Ok("exists\n".into()),
            Ok("ssh-ed25519 AAAB\n".into()),
        ]);
        let prompter = ScriptedPrompter::new(); // key_installed = false
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        let err = orchestrator
            .execute_with_remediation(&["git clone".to_string()], &test_repo())
            .unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));
        assert_eq!(*prompter.asked.borrow(), vec!["key"]);
    }

    #[test]
    fn non_auth_failure_is_terminal_immediately() {
        let failure = DeployError::RemoteExec {
            command: "composer install".into(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "composer requires ext-mbstring".into(),
        };
        let shell = ScriptedShell::new(vec![Err(failure)]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        let err = orchestrator
            .execute_with_remediation(&["composer install".to_string()], &test_repo())
            .unwrap_err();
        assert!(matches!(err, DeployError::RemoteExec { .. }));
        assert_eq!(shell.count_executed("composer install"), 1);
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn run_builds_the_plan_from_the_decided_choice() {
        // not exists -> Direct; execute_many succeeds
        let shell = ScriptedShell::new(vec![Ok("not_exists\n".into()), Ok(String::new())]);
        let prompter = ScriptedPrompter::new();
        let config = test_config();
        let orchestrator = Orchestrator::new(&shell, &prompter, None, &config);

        let report = orchestrator.run(&test_repo(), DeployMode::Auto).unwrap();
        assert_eq!(report.choice, CloneChoice::Direct);
        assert_eq!(report.auth_retries, 0);
        // The joined invocation starts with the idempotent setup steps
        let joined = shell.executed.borrow().last().unwrap().clone();
        assert!(joined.starts_with(
            "mkdir -p '/home/u1/domains/example.com' && cd '/home/u1/domains/example.com' && rm -rf public_html && git clone"
        ));
    }
}
