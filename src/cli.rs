use clap::{Args, Parser, Subcommand};

/// Gangplank - deploy Laravel apps to shared hosting over SSH
#[derive(Parser, Debug)]
#[command(name = "gangplank")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Configuration comes from GANGPLANK_* environment variables; flags win.")]
pub struct Cli {
    /// Verbosity level (-v shows full remote output on failure)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Skip interactive prompts (keep existing checkouts, abort on
    /// unrecognizable directories)
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and target flags shared by the server-facing commands.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// SSH host of the hosting server
    #[arg(long)]
    pub host: Option<String>,

    /// SSH username
    #[arg(long)]
    pub user: Option<String>,

    /// SSH port
    #[arg(long)]
    pub port: Option<u16>,

    /// SSH connect timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Absolute deploy directory on the server
    #[arg(long)]
    pub path: Option<String>,

    /// GitHub token (falls back to GANGPLANK_GITHUB_TOKEN / GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the current repository to the server
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        /// Delete the target directory and clone fresh, without inspection
        #[arg(long)]
        fresh: bool,

        /// Reuse the existing checkout; run only install and maintenance steps
        #[arg(long, conflicts_with = "fresh")]
        skip_git: bool,

        /// Run database migrations after install
        #[arg(long)]
        migrate: bool,
    },

    /// Wire the repository up to GitHub Actions (deploy key, secrets,
    /// variables, workflow file)
    Setup {
        #[command(flatten)]
        target: TargetArgs,

        /// Branch the workflow deploys (defaults to the current branch)
        #[arg(long)]
        branch: Option<String>,

        /// PHP version the workflow pins
        #[arg(long)]
        php_version: Option<String>,

        /// Local private key whose contents become the SSH_PRIVATE_KEY secret
        #[arg(long)]
        identity: Option<String>,
    },

    /// Render the deployment workflow file
    Workflow {
        /// Push through the GitHub contents API instead of writing locally
        #[arg(long)]
        push: bool,

        /// Branch the workflow deploys (defaults to the current branch)
        #[arg(long)]
        branch: Option<String>,

        /// PHP version the workflow pins
        #[arg(long)]
        php_version: Option<String>,

        /// GitHub token (only needed with --push)
        #[arg(long)]
        token: Option<String>,
    },

    /// Pre-flight checks: configuration, SSH connectivity, GitHub auth
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },
}

impl TargetArgs {
    /// Overlay these flags onto an environment-derived config.
    pub fn apply(&self, config: &mut gangplank::Config) {
        if let Some(host) = &self.host {
            config.ssh.host = host.clone();
        }
        if let Some(user) = &self.user {
            config.ssh.username = user.clone();
        }
        if let Some(port) = self.port {
            config.ssh.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.ssh.timeout_secs = timeout;
        }
        if let Some(path) = &self.path {
            config.deploy_path = path.clone();
        }
        if let Some(token) = &self.token {
            config.github_token = Some(token.clone());
        }
    }
}
