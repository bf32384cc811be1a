//! Remote failure classification
//!
//! Decides whether a failed remote step is a recoverable authentication
//! problem (missing deploy key, unknown host key) or a terminal error.
//! The match list is carried as data on the classifier rather than a
//! hard-coded contract: the substrings come from human-readable
//! transport output and vary across git/ssh versions and locales.

use crate::error::DeployError;

/// Substrings that mark git/ssh output as an authentication failure.
pub const DEFAULT_AUTH_PATTERNS: &[&str] = &[
    "permission denied",
    "access denied",
    "repository not found",
    "could not read from remote repository",
    "host key verification failed",
    "authentication failed",
    "publickey",
];

pub struct AuthFailureClassifier {
    patterns: Vec<String>,
}

impl Default for AuthFailureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_PATTERNS.iter().map(|p| p.to_string()).collect())
    }
}

impl AuthFailureClassifier {
    pub fn new(patterns: Vec<String>) -> Self {
        let patterns = patterns.into_iter().map(|p| p.to_lowercase()).collect();
        Self { patterns }
    }

    /// `true` only for remote-execution failures whose output matches a
    /// known authentication pattern. Every other error kind is terminal.
    pub fn is_auth_failure(&self, err: &DeployError) -> bool {
        let DeployError::RemoteExec { stdout, stderr, .. } = err else {
            return false;
        };
        let haystack = format!("{stderr}\n{stdout}").to_lowercase();
        self.patterns.iter().any(|p| haystack.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_err(stderr: &str) -> DeployError {
        DeployError::RemoteExec {
            command: "git clone".into(),
            exit_code: 128,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn matches_missing_deploy_key_output() {
        let classifier = AuthFailureClassifier::default();
        assert!(classifier.is_auth_failure(&exec_err(
            "git@github.com: Permission denied (publickey)."
        )));
        assert!(classifier.is_auth_failure(&exec_err(
            "ERROR: Repository not found.\nfatal: Could not read from remote repository."
        )));
        assert!(classifier.is_auth_failure(&exec_err("Host key verification failed.")));
    }

    #[test]
    fn ignores_unrelated_failures() {
        let classifier = AuthFailureClassifier::default();
        assert!(!classifier.is_auth_failure(&exec_err(
            "PHP Fatal error: composer requires ext-mbstring"
        )));
    }

    #[test]
    fn only_remote_exec_errors_are_recoverable() {
        let classifier = AuthFailureClassifier::default();
        assert!(!classifier.is_auth_failure(&DeployError::connection("Permission denied")));
        assert!(!classifier.is_auth_failure(&DeployError::Cancelled));
    }

    #[test]
    fn custom_pattern_lists_replace_the_defaults() {
        let classifier = AuthFailureClassifier::new(vec!["zugriff verweigert".into()]);
        assert!(classifier.is_auth_failure(&exec_err("Zugriff verweigert (publickey)")));
        assert!(!classifier.is_auth_failure(&exec_err("Permission denied (publickey)")));
    }

    #[test]
    fn matches_in_stdout_as_well_as_stderr() {
        let classifier = AuthFailureClassifier::default();
        let err = DeployError::RemoteExec {
            command: "git clone".into(),
            exit_code: 1,
            stdout: "fatal: Authentication failed for 'https://github.com/o/r.git'".into(),
            stderr: String::new(),
        };
        assert!(classifier.is_auth_failure(&err));
    }
}
