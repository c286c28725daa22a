use crate::config::root_dir;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_max_connections() -> u32 {
    8
}

fn default_tenants_dir() -> String {
    "tenants".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    /// e.g. `sqlite://deviceadm.db?mode=rwc`
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// where per-tenant databases are provisioned
    #[serde(default = "default_tenants_dir")]
    pub tenants_dir: String,
}

impl DatabaseConfig {
    pub fn tenants_dir(&self) -> PathBuf {
        let path = Path::new(&self.tenants_dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root_dir().join(path)
        }
    }
}
