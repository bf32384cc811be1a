//! Terminal output helpers
//!
//! Status lines go to stdout; warnings and errors to stderr. The default
//! error rendering is a short cause plus a remediation checklist; the
//! raw failure context (exit code, stdout, stderr, HTTP detail) only
//! appears under `-v`.

use gangplank::DeployError;

pub fn step(msg: &str) {
    println!("→ {msg}");
}

pub fn success(msg: &str) {
    println!("✓ {msg}");
}

pub fn warn(msg: &str) {
    eprintln!("⚠ {msg}");
}

/// Render a failed run. `verbose > 0` adds the full diagnostic detail.
pub fn report_error(err: &DeployError, verbose: u8) {
    eprintln!("✗ {err}");

    match err {
        DeployError::Config { .. } => {
            eprintln!();
            eprintln!("  Set the values via GANGPLANK_* environment variables or flags,");
            eprintln!("  e.g. GANGPLANK_SSH_HOST, GANGPLANK_SSH_USERNAME, GANGPLANK_DEPLOY_PATH.");
        }
        DeployError::Connection { .. } => {
            eprintln!();
            eprintln!("  Check that:");
            eprintln!("  - the host and port are correct (shared hosts often use a non-standard port)");
            eprintln!("  - your SSH key is authorized on the server (ssh-copy-id)");
            eprintln!("  - SSH access is enabled in the hosting control panel");
        }
        DeployError::RemoteExec {
            exit_code,
            stdout,
            stderr,
            command,
        } => {
            eprintln!();
            eprintln!("  A deployment step failed on the server. Check that:");
            eprintln!("  - git, composer and php are available in the server's PATH");
            eprintln!("  - the deploy path is writable");
            eprintln!("  - the repository's deploy key is still registered");
            if verbose > 0 {
                eprintln!();
                eprintln!("  command: {command}");
                eprintln!("  exit code: {exit_code}");
                if !stdout.trim().is_empty() {
                    eprintln!("  stdout:\n{}", indent(stdout));
                }
                if !stderr.trim().is_empty() {
                    eprintln!("  stderr:\n{}", indent(stderr));
                }
            } else {
                eprintln!();
                eprintln!("  Re-run with -v for the full remote output.");
            }
        }
        DeployError::Provider { status, .. } => {
            eprintln!();
            eprintln!("  Check that the token has repo administration access");
            eprintln!("  (deploy keys, Actions secrets) and has not expired.");
            if verbose > 0 {
                eprintln!("  HTTP status: {status}");
            }
        }
        DeployError::Cancelled => {}
        DeployError::Io(_) | DeployError::Http(_) => {
            if verbose > 0 {
                eprintln!("  {err:?}");
            }
        }
    }
}

fn indent(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(|l| format!("    {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}
