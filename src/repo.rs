//! Repository info resolver
//!
//! Reads local Git metadata (origin URL, current branch) by shelling out
//! to `git`, then parses the remote URL into owner/name regardless of
//! scheme. Absence of a repository or remote is a soft failure: callers
//! get `None` and turn it into a precondition message, not a crash.

use std::path::Path;
use std::process::Command;

/// What we know about the local repository and its hosting page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub host: String,
    pub owner: String,
    pub name: String,
    /// Branch to deploy; falls back to the configured default when the
    /// checkout is detached
    pub branch: String,
    /// The canonical clone URL as configured locally
    pub remote_url: String,
}

impl RepoInfo {
    /// Resolve from the working tree at `dir`. Returns `None` when not in
    /// a Git repository or no `origin` remote is configured.
    pub fn discover(dir: &Path, default_branch: &str) -> Option<Self> {
        let remote_url = git_output(dir, &["config", "--get", "remote.origin.url"])?;
        let (host, owner, name) = parse_remote_url(&remote_url)?;

        let branch = match git_output(dir, &["rev-parse", "--abbrev-ref", "HEAD"]) {
            Some(b) if b != "HEAD" => b,
            _ => default_branch.to_string(),
        };

        Some(Self {
            host,
            owner,
            name,
            branch,
            remote_url,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn settings_url(&self, page: &str) -> String {
        format!("https://{}/{}/{}/settings/{page}", self.host, self.owner, self.name)
    }

    /// Web page listing the repository's Actions secrets.
    pub fn secrets_url(&self) -> String {
        self.settings_url("secrets/actions")
    }

    /// Web page listing the repository's Actions variables.
    pub fn variables_url(&self) -> String {
        self.settings_url("variables/actions")
    }

    /// Web page listing the repository's deploy keys.
    pub fn deploy_keys_url(&self) -> String {
        self.settings_url("keys")
    }
}

fn git_output(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).current_dir(dir).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a Git remote URL into (host, owner, name).
///
/// Accepts the SCP-like SSH form (`git@host:owner/name.git`), explicit
/// `ssh://` URLs, and `https://` URLs, with or without a `.git` suffix.
fn parse_remote_url(url: &str) -> Option<(String, String, String)> {
    let url = url.trim();

    let (host, path) = if let Some(rest) = url.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
        rest.split_once('/')?
    } else if let Some(rest) = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
        rest.split_once('/')?
    } else if url.contains('@') && url.contains(':') {
        // SCP-like: git@host:owner/name.git
        let (_, rest) = url.split_once('@')?;
        rest.split_once(':')?
    } else {
        return None;
    };

    // ssh:// URLs may carry a port on the host part
    let host = host.split_once(':').map_or(host, |(h, _)| h);

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, name) = path.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }

    Some((host.to_string(), owner.to_string(), name.to_string()))
}
