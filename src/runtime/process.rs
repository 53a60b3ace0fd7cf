//! External command execution.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use tokio::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn run_command_impl(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<bool> {
        debug!("Running {} {:?} in {:?}", program, args, cwd);
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .await
            .with_context(|| format!("Failed to run {}", program))?;
        debug!("{} exited with {}", program, status);
        Ok(status.success())
    }
}
