//! Configuration module for Gangplank
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (GANGPLANK_*, plus GITHUB_TOKEN fallback)
//! 3. Built-in defaults (lowest priority)
//!
//! A `Config` is built once at the entry point and passed into every
//! component; nothing reads the environment after construction.

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_PHP_VERSION: &str = "8.3";
pub const DEFAULT_COMPOSER_FLAGS: &str = "--no-dev --optimize-autoloader --no-interaction";
pub const DEFAULT_WORKFLOW_PATH: &str = ".github/workflows/deploy.yml";
pub const DEFAULT_IDENTITY_FILE: &str = "~/.ssh/id_ed25519";

/// SSH connection target. Immutable once constructed; the runner owns a
/// copy for the lifetime of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub host: String,
    pub username: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl SshConfig {
    /// The `user@host` destination string given to ssh.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

/// Which configuration values a command actually requires.
///
/// `deploy` works without a GitHub token (manual deploy-key fallback);
/// `setup` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// SSH target + deploy path
    Deploy,
    /// SSH target + deploy path + GitHub token
    Setup,
    /// Nothing beyond defaults (local workflow rendering)
    Local,
}

/// Full configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub ssh: SshConfig,
    /// Absolute deploy target directory on the server
    pub deploy_path: String,
    pub github_token: Option<String>,
    /// Fallback branch when the local checkout is detached
    pub default_branch: String,
    pub php_version: String,
    pub composer_flags: String,
    pub run_migrations: bool,
    pub storage_link: bool,
    /// Repository-relative path of the published workflow file
    pub workflow_path: String,
    /// Local private key whose contents become the SSH_PRIVATE_KEY secret
    pub identity_file: String,
    /// Override for the auth-failure match list; `None` keeps the built-in
    /// defaults. The substrings vary across git/ssh versions and locales,
    /// so they are configuration rather than a contract.
    pub auth_patterns: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssh: SshConfig {
                host: String::new(),
                username: String::new(),
                port: DEFAULT_SSH_PORT,
                timeout_secs: DEFAULT_SSH_TIMEOUT_SECS,
            },
            deploy_path: String::new(),
            github_token: None,
            default_branch: DEFAULT_BRANCH.to_string(),
            php_version: DEFAULT_PHP_VERSION.to_string(),
            composer_flags: DEFAULT_COMPOSER_FLAGS.to_string(),
            run_migrations: false,
            storage_link: true,
            workflow_path: DEFAULT_WORKFLOW_PATH.to_string(),
            identity_file: DEFAULT_IDENTITY_FILE.to_string(),
            auth_patterns: None,
        }
    }
}

impl Config {
    /// Build from environment variables on top of defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("GANGPLANK_SSH_HOST") {
            self.ssh.host = host;
        }
        if let Ok(user) = std::env::var("GANGPLANK_SSH_USERNAME") {
            self.ssh.username = user;
        }
        if let Ok(port) = std::env::var("GANGPLANK_SSH_PORT") {
            if let Ok(port) = port.parse() {
                self.ssh.port = port;
            }
        }
        if let Ok(timeout) = std::env::var("GANGPLANK_SSH_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.ssh.timeout_secs = timeout;
            }
        }
        if let Ok(path) = std::env::var("GANGPLANK_DEPLOY_PATH") {
            self.deploy_path = path;
        }
        // GANGPLANK_GITHUB_TOKEN wins over the conventional GITHUB_TOKEN
        if let Ok(token) = std::env::var("GANGPLANK_GITHUB_TOKEN") {
            self.github_token = Some(token);
        } else if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Ok(branch) = std::env::var("GANGPLANK_BRANCH") {
            self.default_branch = branch;
        }
        if let Ok(version) = std::env::var("GANGPLANK_PHP_VERSION") {
            self.php_version = version;
        }
        if let Ok(flags) = std::env::var("GANGPLANK_COMPOSER_FLAGS") {
            self.composer_flags = flags;
        }
        if let Ok(val) = std::env::var("GANGPLANK_RUN_MIGRATIONS") {
            self.run_migrations = parse_bool(&val).unwrap_or(self.run_migrations);
        }
        if let Ok(val) = std::env::var("GANGPLANK_STORAGE_LINK") {
            self.storage_link = parse_bool(&val).unwrap_or(self.storage_link);
        }
        if let Ok(path) = std::env::var("GANGPLANK_WORKFLOW_PATH") {
            self.workflow_path = path;
        }
        if let Ok(path) = std::env::var("GANGPLANK_IDENTITY_FILE") {
            self.identity_file = path;
        }
        if let Ok(patterns) = std::env::var("GANGPLANK_AUTH_PATTERNS") {
            let patterns = parse_patterns(&patterns);
            if !patterns.is_empty() {
                self.auth_patterns = Some(patterns);
            }
        }
        self
    }

    /// Validate before any network action. Collects every missing required
    /// value so the user fixes them in one pass, not one at a time.
    pub fn validate(&self, scope: ConfigScope) -> DeployResult<()> {
        if scope == ConfigScope::Local {
            return Ok(());
        }

        let mut missing = Vec::new();
        if self.ssh.host.trim().is_empty() {
            missing.push("ssh host (GANGPLANK_SSH_HOST or --host)".to_string());
        }
        if self.ssh.username.trim().is_empty() {
            missing.push("ssh username (GANGPLANK_SSH_USERNAME or --user)".to_string());
        }
        if self.deploy_path.trim().is_empty() {
            missing.push("deploy path (GANGPLANK_DEPLOY_PATH or --path)".to_string());
        }
        if scope == ConfigScope::Setup
            && self.github_token.as_deref().map_or(true, |t| t.trim().is_empty())
        {
            missing.push("GitHub token (GANGPLANK_GITHUB_TOKEN or --token)".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DeployError::Config { missing })
        }
    }

    /// Expand a leading `~/` in the identity-file path.
    pub fn identity_path(&self) -> std::path::PathBuf {
        if let Some(rest) = self.identity_file.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        std::path::PathBuf::from(&self.identity_file)
    }
}

/// Comma-separated substring list; entries trimmed, empties dropped.
fn parse_patterns(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
