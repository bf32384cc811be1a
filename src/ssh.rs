//! Remote command runner
//!
//! Wraps the system `ssh` client: one subprocess per remote invocation,
//! key-based auth, host keys accepted and remembered on first contact so
//! nothing ever blocks on an interactive prompt.

use std::process::{Command, Stdio};

use crate::config::SshConfig;
use crate::error::{DeployError, DeployResult};

/// Default server-side key pair used for pulling the repository.
pub const SERVER_KEY_PATH: &str = "$HOME/.ssh/id_ed25519";

/// Seam between the orchestrator and the transport.
///
/// The helper predicates are default methods built on `execute` so a test
/// double only has to fake one call.
pub trait RemoteShell {
    /// Run one remote command, returning its stdout on exit code zero.
    fn execute(&self, command: &str) -> DeployResult<String>;

    /// Join commands with `&&` into a single invocation. Fail-fast: the
    /// first failing step aborts the remainder and its failure context is
    /// what surfaces. Deployment steps are order-dependent, so best-effort
    /// continuation would be wrong here.
    fn execute_many(&self, commands: &[String]) -> DeployResult<String> {
        self.execute(&commands.join(" && "))
    }

    /// `true` iff the remote path is an existing directory. Errors only on
    /// transport failure, never on a negative answer.
    fn directory_exists(&self, path: &str) -> DeployResult<bool> {
        let out = self.execute(&format!(
            "[ -d {} ] && echo exists || echo not_exists",
            shell_quote(path)
        ))?;
        Ok(out.trim() == "exists")
    }

    fn file_exists(&self, path: &str) -> DeployResult<bool> {
        let out = self.execute(&format!(
            "[ -f {} ] && echo exists || echo not_exists",
            shell_quote(path)
        ))?;
        Ok(out.trim() == "exists")
    }

    fn directory_is_empty(&self, path: &str) -> DeployResult<bool> {
        let out = self.execute(&format!(
            "[ -z \"$(ls -A {} 2>/dev/null)\" ] && echo empty || echo not_empty",
            shell_quote(path)
        ))?;
        Ok(out.trim() == "empty")
    }

    /// Whether the server already has a deploy key pair.
    fn ssh_key_exists(&self) -> DeployResult<bool> {
        let out = self.execute(&format!(
            "[ -f {SERVER_KEY_PATH}.pub ] && echo exists || echo not_exists"
        ))?;
        Ok(out.trim() == "exists")
    }

    /// Generate the server-side key pair. Not idempotent; callers check
    /// `ssh_key_exists` first.
    fn generate_ssh_key(&self, comment: &str) -> DeployResult<()> {
        self.execute(&format!(
            "mkdir -p $HOME/.ssh && ssh-keygen -t ed25519 -f {SERVER_KEY_PATH} -N '' -C {}",
            shell_quote(comment)
        ))?;
        Ok(())
    }

    fn read_public_key(&self) -> DeployResult<String> {
        Ok(self.execute(&format!("cat {SERVER_KEY_PATH}.pub"))?.trim().to_string())
    }

    /// Append a public key to the server's authorized_keys unless already
    /// present.
    fn add_to_authorized_keys(&self, public_key: &str) -> DeployResult<()> {
        let quoted = shell_quote(public_key.trim());
        self.execute(&format!(
            "mkdir -p $HOME/.ssh && touch $HOME/.ssh/authorized_keys && \
             grep -qxF {quoted} $HOME/.ssh/authorized_keys || echo {quoted} >> $HOME/.ssh/authorized_keys"
        ))?;
        Ok(())
    }
}

/// Runs remote commands through the system `ssh` binary.
pub struct SshRunner {
    config: SshConfig,
}

impl SshRunner {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Probe the connection with a trivial command before anything that
    /// mutates server state. Maps failure to a connection error rather
    /// than a remote-execution one.
    pub fn check_connection(&self) -> DeployResult<()> {
        match self.execute("echo connected") {
            Ok(_) => Ok(()),
            Err(DeployError::RemoteExec { stderr, .. }) => {
                Err(DeployError::connection(first_line(&stderr)))
            }
            Err(err) => Err(err),
        }
    }
}

impl RemoteShell for SshRunner {
    fn execute(&self, command: &str) -> DeployResult<String> {
        // The whole remote command travels as a single argv entry; the
        // remote shell sees exactly one string, so quoting decisions are
        // made once, here and in shell_quote.
        let output = Command::new("ssh")
            .arg("-p")
            .arg(self.config.port.to_string())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.config.timeout_secs))
            .arg(self.config.destination())
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DeployError::connection(format!("failed to spawn ssh: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(DeployError::RemoteExec {
                command: command.to_string(),
                exit_code: output.status.code().unwrap_or(DeployError::SIGNAL_EXIT),
                stdout,
                stderr,
            })
        }
    }
}

/// Single-quote a string for the remote shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or("connection failed").trim().to_string()
}
