use anyhow::{Context, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod database_config;
mod deviceauth_config;
mod logs_config;
mod server_config;

pub use database_config::DatabaseConfig;
pub use deviceauth_config::DevAuthConfig;
pub use logs_config::LogsConfig;
pub use server_config::ServerConfig;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub deviceauth: DevAuthConfig,
    pub logs: LogsConfig,
}

/// Base directory for relative paths in the configuration
pub(crate) fn root_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn parse_config_path(mut args: impl Iterator<Item = String>) -> anyhow::Result<PathBuf> {
    while let Some(arg) = args.next() {
        if arg == "-c" || arg == "--config" {
            return match args.next() {
                Some(path) => Ok(Path::new(&path).to_path_buf()),
                None => Err(anyhow!(
                    "Error: Please specify path string for -c argument."
                )),
            };
        }
    }
    Err(anyhow!(
        "Error: Please specify configuration file argument. Usage: -c <config_file>"
    ))
}

fn parse(content: &str) -> anyhow::Result<Config> {
    toml::from_str(content).with_context(|| {
        "Error: Failed to parse configuration file.\n\
        Please check the file syntax is valid TOML syntax"
    })
}

pub fn load() -> anyhow::Result<Config> {
    let path = parse_config_path(std::env::args().skip(1))?;
    if !path.is_file() {
        return Err(anyhow!(
            "Error: Configuration file not found or invalid.\n\
        Please make sure that the configuration file exists and is a valid TOML file.\n\
        Expected file path: {:?}",
            path
        ));
    }
    let content = std::fs::read_to_string(&path).with_context(|| {
        "Error: Failed to read configuration file.\n\
        Please check the file path and file permissions, and make sure the file is valid accessible"
    })?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use std::time::Duration;
    use tracing::Level;

    fn args(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter()
            .map(|it| it.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_config_path() {
        assert_eq!(
            parse_config_path(args(&["-c", "config.toml"])).unwrap(),
            PathBuf::from("config.toml")
        );
        assert_eq!(
            parse_config_path(args(&["--verbose", "--config", "/etc/deviceadm.toml"])).unwrap(),
            PathBuf::from("/etc/deviceadm.toml")
        );
        assert!(parse_config_path(args(&["-c"])).is_err());
        assert!(parse_config_path(args(&[])).is_err());
    }

    #[test]
    fn test_parse_example_config() {
        let config = parse(include_str!("../../config.example.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logs.level, Level::INFO);
        assert!(!config.logs.enable_file_logging);
        let client = ClientConfig::from(&config.deviceauth);
        assert_eq!(client.endpoint, "http://mender-device-auth:8080");
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.max_retries, 2);
    }

    #[test]
    fn test_parse_defaults_and_errors() {
        let config = parse(
            r#"
            [server]
            [database]
            url = "sqlite::memory:"
            [deviceauth]
            endpoint = "http://localhost:9000"
            [logs]
            level = "DEBUG"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 8);
        assert!(config.database.tenants_dir().ends_with("tenants"));
        assert_eq!(config.deviceauth.timeout_secs, 10);
        assert_eq!(config.deviceauth.max_retries, 0);
        assert_eq!(config.logs.level, Level::DEBUG);
        assert!(config.logs.storage_path.is_none());

        let err = parse(
            r#"
            [server]
            [database]
            url = "sqlite::memory:"
            [deviceauth]
            endpoint = "http://localhost:9000"
            [logs]
            level = "verbose"
            "#,
        );
        assert!(err.is_err());
    }
}
