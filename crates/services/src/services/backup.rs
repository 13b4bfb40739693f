//! One-time snapshot of the protected files, taken on first boot.
//!
//! The snapshot directory is created only when it is missing, so later boots
//! never refresh it: it keeps the files as they were on the first run. With
//! auto-restore on, every file that has a snapshot copy is written back over
//! the live file before the listener binds.

use std::{path::PathBuf, sync::Arc};

use tracing::{info, warn};

use super::{
    config::{GatewayConfig, PROTECTED_FILES},
    storage::FileStorage,
};

/// What the startup phase did. Failures are collected, never raised.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub created: bool,
    pub backed_up: Vec<String>,
    pub restored: Vec<String>,
    pub failures: Vec<String>,
}

impl BackupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BackupGuard {
    storage: Arc<dyn FileStorage>,
    app_root: PathBuf,
    backup_dir: PathBuf,
}

impl BackupGuard {
    pub fn new(storage: Arc<dyn FileStorage>, config: &GatewayConfig) -> Self {
        Self {
            storage,
            app_root: config.app_root.clone(),
            backup_dir: config.backup_dir.clone(),
        }
    }

    /// Snapshot (if needed) then optionally restore.
    pub async fn run(&self, auto_restore: bool) -> BackupReport {
        let mut report = BackupReport::default();
        self.snapshot_once(&mut report).await;
        if auto_restore {
            self.restore(&mut report).await;
        }
        report
    }

    async fn snapshot_once(&self, report: &mut BackupReport) {
        if self.storage.exists(&self.backup_dir).await {
            return;
        }

        if let Err(e) = self.storage.create_dir(&self.backup_dir).await {
            warn!("Backup failed: {}", e);
            report.failures.push(e.to_string());
            return;
        }
        report.created = true;

        for name in PROTECTED_FILES {
            let src = self.app_root.join(name);
            if !self.storage.exists(&src).await {
                continue;
            }
            match self.storage.copy(&src, &self.backup_dir.join(name)).await {
                Ok(()) => report.backed_up.push(name.to_string()),
                Err(e) => {
                    warn!("Failed to back up {}: {}", name, e);
                    report.failures.push(e.to_string());
                }
            }
        }

        info!(
            "Created hidden backup at {} ({} files)",
            self.backup_dir.display(),
            report.backed_up.len()
        );
    }

    async fn restore(&self, report: &mut BackupReport) {
        for name in PROTECTED_FILES {
            let bak = self.backup_dir.join(name);
            if !self.storage.exists(&bak).await {
                continue;
            }
            match self.storage.copy(&bak, &self.app_root.join(name)).await {
                Ok(()) => report.restored.push(name.to_string()),
                Err(e) => {
                    warn!("Failed to restore {}: {}", name, e);
                    report.failures.push(e.to_string());
                }
            }
        }
        info!(
            "Auto-restored {} protected files from hidden backup",
            report.restored.len()
        );
    }
}
