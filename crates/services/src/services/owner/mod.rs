//! Privileged operations gated by the owner password: shell execution,
//! self-edit of the protected files, remote stop, the agent switch, the
//! fetch allow-list and a status readout.
//!
//! Every operation goes through [`OwnerConsole::authorize`] first; a wrong
//! password returns before any side effect.

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::{
    config::GatewayConfig,
    fetch::DomainPolicy,
    storage::{FileStorage, StorageError},
};

pub mod blocklist;
pub mod process;
pub mod switch;

pub use process::{
    CommandFailure, CommandOutput, CommandRunner, ProcessTerminator, ShellRunner, Terminator,
};
pub use switch::AgentSwitch;

pub const EXEC_TIMEOUT: Duration = Duration::from_secs(15);
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(60);
pub const STOP_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum OwnerError {
    #[error("shell execution is disabled")]
    ShellDisabled,
    #[error("unauthorized")]
    Unauthorized,
    #[error("no command given")]
    NoCommand,
    #[error("command matches blocked pattern {0}")]
    BlockedCommand(&'static str),
    #[error("{0}")]
    Exec(String),
    #[error("file not allowed: {0}")]
    FileNotAllowed(String),
    #[error("content must be a string")]
    MissingContent,
    #[error(transparent)]
    Write(#[from] StorageError),
    #[error("Server restart failed: {0}")]
    Restart(String),
    #[error("no domain given")]
    NoDomain,
}

impl OwnerError {
    pub fn details(&self) -> Option<Value> {
        match self {
            OwnerError::Exec(detail) | OwnerError::Restart(detail) => {
                Some(Value::String(detail.clone()))
            }
            OwnerError::Write(e) => Some(Value::String(e.to_string())),
            OwnerError::MissingContent => Some(Value::String(self.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub password: Option<String>,
    pub command: Option<String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SelfEditRequest {
    pub password: Option<String>,
    pub filename: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStatus {
    pub model: String,
    pub tts_model: String,
    pub voice: String,
    pub shell_enabled: bool,
    pub unsafe_exec: bool,
    pub auto_restore: bool,
    pub blocked_domains: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub shutdown: bool,
    pub llm_configured: bool,
}

pub struct OwnerConsole {
    config: Arc<GatewayConfig>,
    storage: Arc<dyn FileStorage>,
    runner: Arc<dyn CommandRunner>,
    terminator: Arc<dyn Terminator>,
    domains: Arc<DomainPolicy>,
    switch: Arc<AgentSwitch>,
}

impl OwnerConsole {
    pub fn new(
        config: Arc<GatewayConfig>,
        storage: Arc<dyn FileStorage>,
        runner: Arc<dyn CommandRunner>,
        terminator: Arc<dyn Terminator>,
        domains: Arc<DomainPolicy>,
        switch: Arc<AgentSwitch>,
    ) -> Self {
        Self {
            config,
            storage,
            runner,
            terminator,
            domains,
            switch,
        }
    }

    /// Exact match against the configured owner password.
    pub fn authorize(&self, password: Option<&str>) -> Result<(), OwnerError> {
        match password {
            Some(given) if given == self.config.owner_password => Ok(()),
            _ => {
                tracing::warn!("Rejected owner request with wrong password");
                Err(OwnerError::Unauthorized)
            }
        }
    }

    pub async fn exec(&self, request: ExecRequest) -> Result<CommandOutput, OwnerError> {
        if !self.config.enable_shell {
            return Err(OwnerError::ShellDisabled);
        }
        self.authorize(request.password.as_deref())?;
        let command = utils::text::non_blank(request.command.as_deref())
            .ok_or(OwnerError::NoCommand)?;

        if !self.config.unsafe_exec {
            if let Some(pattern) = blocklist::blocked_pattern(command) {
                tracing::warn!("Blocked owner command {:?} (pattern {})", command, pattern);
                return Err(OwnerError::BlockedCommand(pattern));
            }
        }

        let cwd = utils::text::non_blank(request.cwd.as_deref()).map(PathBuf::from);
        tracing::info!("Owner exec: {}", command);
        self.runner
            .run(command, cwd.as_deref(), EXEC_TIMEOUT)
            .await
            .map_err(|failure| OwnerError::Exec(failure.describe(command)))
    }

    /// Overwrite one protected file, then run the restart command if one is
    /// configured.
    pub async fn self_edit(&self, request: SelfEditRequest) -> Result<(), OwnerError> {
        self.authorize(request.password.as_deref())?;
        let filename = request.filename.unwrap_or_default();
        if !GatewayConfig::is_protected(&filename) {
            return Err(OwnerError::FileNotAllowed(filename));
        }
        let content = request.content.ok_or(OwnerError::MissingContent)?;

        let target = self.config.live_path(&filename);
        self.storage.write(&target, content.as_bytes()).await?;
        tracing::info!("Self-edit wrote {} ({} bytes)", target.display(), content.len());

        if let Some(restart) = &self.config.restart_command {
            self.runner
                .run(restart, Some(self.config.app_root()), RESTART_TIMEOUT)
                .await
                .map_err(|failure| match failure {
                    CommandFailure::Exited { output, .. } => OwnerError::Restart(output.stderr),
                    other => OwnerError::Restart(other.describe(restart)),
                })?;
            tracing::info!("Restart command completed: {}", restart);
        }
        Ok(())
    }

    pub fn stop(&self, password: Option<&str>) -> Result<(), OwnerError> {
        self.authorize(password)?;
        tracing::warn!("Owner requested stop; exiting in {:?}", STOP_DELAY);
        self.terminator.schedule_exit(STOP_DELAY);
        Ok(())
    }

    pub fn shutdown(&self, password: Option<&str>) -> Result<(), OwnerError> {
        self.authorize(password)?;
        self.switch.shut_down();
        Ok(())
    }

    pub fn start(&self, password: Option<&str>) -> Result<(), OwnerError> {
        self.authorize(password)?;
        self.switch.start();
        Ok(())
    }

    /// Add a host to the fetch allow-list; returns the whole list.
    pub fn allow_domain(
        &self,
        password: Option<&str>,
        domain: Option<&str>,
    ) -> Result<Vec<String>, OwnerError> {
        self.authorize(password)?;
        let domain = utils::text::non_blank(domain).ok_or(OwnerError::NoDomain)?;
        Ok(self.domains.allow(domain))
    }

    pub fn status(
        &self,
        password: Option<&str>,
        llm_configured: bool,
    ) -> Result<OwnerStatus, OwnerError> {
        self.authorize(password)?;
        Ok(OwnerStatus {
            model: self.config.chat_model.clone(),
            tts_model: self.config.tts_model.clone(),
            voice: self.config.default_voice.clone(),
            shell_enabled: self.config.enable_shell,
            unsafe_exec: self.config.unsafe_exec,
            auto_restore: self.config.auto_restore,
            blocked_domains: self.domains.blocked().to_vec(),
            allowed_domains: self.domains.allowed(),
            shutdown: self.switch.is_shut_down(),
            llm_configured,
        })
    }
}
