//! Common test utilities for Gangplank integration tests.
//!
//! `TestEnv` is an isolated project directory plus helpers to run the
//! built binary with a scrubbed environment, so tests never see the
//! developer's real GANGPLANK_* or GITHUB_TOKEN values.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Environment variables scrubbed from every test invocation.
const SCRUBBED_ENV: &[&str] = &[
    "GANGPLANK_SSH_HOST",
    "GANGPLANK_SSH_USERNAME",
    "GANGPLANK_SSH_PORT",
    "GANGPLANK_SSH_TIMEOUT",
    "GANGPLANK_DEPLOY_PATH",
    "GANGPLANK_GITHUB_TOKEN",
    "GANGPLANK_BRANCH",
    "GANGPLANK_PHP_VERSION",
    "GANGPLANK_COMPOSER_FLAGS",
    "GANGPLANK_RUN_MIGRATIONS",
    "GANGPLANK_STORAGE_LINK",
    "GANGPLANK_WORKFLOW_PATH",
    "GANGPLANK_IDENTITY_FILE",
    "GANGPLANK_AUTH_PATTERNS",
    "GITHUB_TOKEN",
];

/// Result of running a Gangplank CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment with a temp project directory.
pub struct TestEnv {
    pub project_root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project_root: TempDir::new().expect("failed to create temp project dir"),
        }
    }

    /// New environment whose project directory is a Git repository with
    /// an `origin` remote and one commit on `main`.
    pub fn with_git_repo(remote_url: &str) -> Self {
        let env = Self::new();
        env.git(&["init", "-q", "-b", "main"]);
        env.git(&["config", "user.email", "test@example.com"]);
        env.git(&["config", "user.name", "Test"]);
        env.git(&["remote", "add", "origin", remote_url]);
        env.write_project_file("README.md", "# app\n");
        env.git(&["add", "."]);
        env.git(&["commit", "-q", "-m", "init"]);
        env
    }

    pub fn project_path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    pub fn write_project_file(&self, relative: &str, content: &str) {
        let full = self.project_path(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create directories");
        }
        std::fs::write(full, content).expect("failed to write project file");
    }

    pub fn read_project_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.project_path(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    /// Run gangplank in this environment from the project root.
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gangplank"));
        cmd.current_dir(self.project_root.path()).args(args);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        for (key, value) in env_vars {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("failed to execute gangplank");
        output_to_result(output)
    }

    fn git(&self, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(self.project_root.path())
            .status()
            .expect("failed to run git");
        assert!(status.success(), "git {args:?} failed");
    }
}

fn output_to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Convenience for asserting against a path that may not exist.
pub fn path_exists(path: &Path) -> bool {
    path.exists()
}
