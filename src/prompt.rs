//! Interactive prompt seam
//!
//! All user-interaction points sit behind the `Prompter` trait so the
//! orchestrator's decision logic is testable without a terminal. The
//! dialoguer-backed implementation is only constructed when stdin is a
//! TTY; otherwise `AssumeDefaults` answers conservatively (keep existing
//! checkouts, abort on unrecognizable directories).

use dialoguer::{Confirm, Select};

use crate::error::{DeployError, DeployResult};

/// How to reconcile a non-empty target that already holds a recognizable
/// checkout of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileChoice {
    /// Delete the directory and clone fresh
    Replace,
    /// Keep the existing checkout and continue with the remaining steps
    Keep,
}

/// How to reconcile a non-empty target whose contents we do not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignChoice {
    Replace,
    Abort,
}

pub trait Prompter {
    /// Target holds what looks like an existing install of this app.
    fn reconcile_existing(&self, path: &str) -> DeployResult<ReconcileChoice>;

    /// Target holds something unrecognizable; never silently proceed.
    fn reconcile_foreign(&self, path: &str) -> DeployResult<ForeignChoice>;

    /// Show the server's public key and wait for the user to register it
    /// manually. `false` means the user declined.
    fn confirm_key_installed(&self, public_key: &str, keys_url: &str) -> DeployResult<bool>;
}

/// Terminal prompter backed by dialoguer.
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn reconcile_existing(&self, path: &str) -> DeployResult<ReconcileChoice> {
        eprintln!("\n{path} already contains an installed application.");
        let selection = Select::new()
            .with_prompt("How should the existing checkout be handled?")
            .items(&[
                "Keep it and continue (composer install, artisan tasks)",
                "Replace it (delete and clone fresh)",
            ])
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        Ok(match selection {
            1 => ReconcileChoice::Replace,
            _ => ReconcileChoice::Keep,
        })
    }

    fn reconcile_foreign(&self, path: &str) -> DeployResult<ForeignChoice> {
        eprintln!("\n{path} is not empty and does not look like a deployment of this app.");
        let selection = Select::new()
            .with_prompt("How should it be handled?")
            .items(&[
                "Abort (leave the directory untouched)",
                "Replace it (delete and clone fresh)",
            ])
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        Ok(match selection {
            1 => ForeignChoice::Replace,
            _ => ForeignChoice::Abort,
        })
    }

    fn confirm_key_installed(&self, public_key: &str, keys_url: &str) -> DeployResult<bool> {
        eprintln!("\nThe server could not authenticate against the repository.");
        eprintln!("Add this deploy key at {keys_url}:\n");
        eprintln!("  {public_key}\n");
        Confirm::new()
            .with_prompt("Key added - retry the deployment?")
            .default(true)
            .interact()
            .map_err(prompt_error)
    }
}

/// Non-interactive answers for `--yes` runs and non-TTY environments.
pub struct AssumeDefaults;

impl Prompter for AssumeDefaults {
    fn reconcile_existing(&self, _path: &str) -> DeployResult<ReconcileChoice> {
        Ok(ReconcileChoice::Keep)
    }

    fn reconcile_foreign(&self, _path: &str) -> DeployResult<ForeignChoice> {
        Ok(ForeignChoice::Abort)
    }

    fn confirm_key_installed(&self, public_key: &str, keys_url: &str) -> DeployResult<bool> {
        // Nothing to wait for without a terminal; print the key so the
        // run at least leaves the user with the remediation material.
        eprintln!("Deploy key for {keys_url}:\n  {public_key}");
        Ok(false)
    }
}

fn prompt_error(err: dialoguer::Error) -> DeployError {
    match err {
        dialoguer::Error::IO(io) => DeployError::Io(io),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_defaults_keeps_recognizable_checkouts() {
        assert_eq!(
            AssumeDefaults.reconcile_existing("/srv/app").unwrap(),
            ReconcileChoice::Keep
        );
    }

    #[test]
    fn assume_defaults_aborts_on_foreign_directories() {
        assert_eq!(
            AssumeDefaults.reconcile_foreign("/srv/app").unwrap(),
            ForeignChoice::Abort
        );
    }

    #[test]
    fn assume_defaults_declines_manual_key_confirmation() {
        assert!(!AssumeDefaults
            .confirm_key_installed("ssh-ed25519 AAAA", "https://github.com/o/r/settings/keys")
            .unwrap());
    }
}
