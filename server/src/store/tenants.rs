use crate::store::sqlite::MIGRATOR;
use anyhow::Context;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("invalid tenant id: {0}")]
    Validation(String),
    #[error("failed to provision tenant database: {0:#}")]
    Provision(anyhow::Error),
}

/// Tenant ids end up in file names, only ASCII letters, digits, `-` and `_` are allowed
fn ensure_tenant_id(tenant_id: &str) -> Result<(), TenantError> {
    if tenant_id.is_empty() {
        return Err(TenantError::Validation(
            "tenant id must not be empty".to_string(),
        ));
    }
    if !tenant_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TenantError::Validation(format!(
            "unsupported characters in '{tenant_id}'"
        )));
    }
    Ok(())
}

/// Creates one SQLite database per tenant, `deviceadm-{tenant_id}.db` under `dir`.
pub struct TenantProvisioner {
    dir: PathBuf,
}

impl TenantProvisioner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn database_path(&self, tenant_id: &str) -> PathBuf {
        self.dir.join(format!("deviceadm-{tenant_id}.db"))
    }

    /// Creates the tenant database when missing and applies pending migrations.
    ///
    /// Provisioning an existing tenant again only re-checks its migrations.
    pub async fn provision(&self, tenant_id: &str) -> Result<PathBuf, TenantError> {
        ensure_tenant_id(tenant_id)?;
        let path = self.database_path(tenant_id);
        Self::migrate(&self.dir, &path)
            .await
            .map_err(TenantError::Provision)?;
        tracing::info!(tenant_id, path = ?path, "tenant database provisioned");
        Ok(path)
    }

    async fn migrate(dir: &Path, path: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create tenants directory {dir:?}"))?;
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .with_context(|| format!("Failed to open tenant database {path:?}"))?;
        MIGRATOR
            .run_direct(&mut conn)
            .await
            .with_context(|| format!("Failed to migrate tenant database {path:?}"))?;
        conn.close().await?;
        Ok(())
    }
}
