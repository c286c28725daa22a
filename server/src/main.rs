use crate::logging::LogWriter;
use std::sync::Arc;
use tokio::net::TcpListener;

mod client;
mod config;
mod errors;
mod extractors;
mod logging;
mod middlewares;
mod models;
mod routes;
mod server;
mod services;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load()?;
    let (mut logs, logs_handle) = LogWriter::new()?;
    logging::registry_logs(&mut logs, &config.logs)?;
    let config::ServerConfig { host, port } = config.server.clone();
    let bind = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Listening on http://{}", bind.local_addr()?);
    server::run_until_done(
        server::ServerArgs {
            logs: Arc::new(logs),
            config: &config,
        },
        bind,
    )
    .await?;
    logs_handle.await??;
    Ok(())
}
