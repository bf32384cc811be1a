//! Workflow template
//!
//! The published GitHub Actions pipeline: build-check the app on the
//! runner, then pull and refresh the checkout on the server over SSH.
//! Rendering substitutes the branch and PHP version tokens; connection
//! material comes from the Actions secrets and variables the setup flow
//! creates, never from the rendered file itself.

use std::path::{Path, PathBuf};

use crate::error::DeployResult;

pub const BRANCH_TOKEN: &str = "{{branch}}";
pub const PHP_VERSION_TOKEN: &str = "{{php_version}}";

pub const WORKFLOW_TEMPLATE: &str = r#"name: Deploy

on:
  push:
    branches: ["{{branch}}"]
  workflow_dispatch:

jobs:
  deploy:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4

      - uses: shivammathur/setup-php@v2
        with:
          php-version: "{{php_version}}"

      - name: Validate composer manifest
        run: composer validate --strict --no-check-publish

      - name: Deploy over SSH
        uses: appleboy/ssh-action@v1
        with:
          host: ${{ secrets.SSH_HOST }}
          username: ${{ secrets.SSH_USERNAME }}
          key: ${{ secrets.SSH_PRIVATE_KEY }}
          port: ${{ vars.SSH_PORT }}
          script_stop: true
          script: |
            cd ${{ vars.DEPLOY_PATH }}
            git pull origin {{branch}}
            composer install --no-dev --optimize-autoloader --no-interaction
            php artisan migrate --force
            php artisan storage:link --force
"#;

/// Substitute the placeholder tokens into the embedded template.
pub fn render_workflow(branch: &str, php_version: &str) -> String {
    WORKFLOW_TEMPLATE
        .replace(BRANCH_TOKEN, branch)
        .replace(PHP_VERSION_TOKEN, php_version)
}

/// Write the rendered workflow under `root`, creating parent directories
/// as needed. Returns the full path written.
pub fn write_local(root: &Path, workflow_path: &str, content: &str) -> DeployResult<PathBuf> {
    let full = root.join(workflow_path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&full, content)?;
    Ok(full)
}
