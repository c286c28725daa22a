use crate::config::Config;
use crate::logging::LogWriter;
use crate::{routes, state};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

pub struct ServerArgs<'a> {
    pub logs: Arc<LogWriter>,
    pub config: &'a Config,
}

pub async fn run_until_done(args: ServerArgs<'_>, bind: TcpListener) -> anyhow::Result<()> {
    let mut signals: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let shutdown_signal = CancellationToken::new();
    let state = state::AppState::build(args.config).await?;
    // axum serve
    let mut server = {
        let shutdown_signal = shutdown_signal.clone();
        tokio::spawn(async move {
            let routes = routes::build().with_state(state);
            axum::serve(
                bind,
                routes.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_signal.cancelled().await;
            })
            .await?;
            Ok::<_, anyhow::Error>(())
        })
    };
    // register ctrl+c signal
    {
        let shutdown_signal = shutdown_signal.clone();
        signals.spawn(async move {
            signal::ctrl_c().await?;
            tracing::debug!("Received ctrl+c, start terminating");
            shutdown_signal.cancel();
            Ok(())
        });
    }
    // register sigterm signal to terminate
    // register usr1 signal to reopen log files when received
    #[cfg(unix)]
    {
        let shutdown_signal = shutdown_signal.clone();
        let logs = args.logs.clone();
        signals.spawn(async move {
            let mut usr1 = signal::unix::signal(signal::unix::SignalKind::user_defined1())?;
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::debug!("Received SIGTERM signal, start terminating");
                        shutdown_signal.cancel();
                        return Ok(());
                    }
                    _ = usr1.recv() => {
                        tracing::debug!("Received USR1 signal, start reopening log files");
                        match logs.reopen() {
                            Ok(_) => tracing::info!("Log files reopen successful."),
                            Err(err) => eprintln!("Failed to reopen log files: {err:?}")
                        }
                    }
                }
            }
        });
    }
    let result = loop {
        tokio::select! {
            r = &mut server => break r,
            Some(r) = signals.join_next() => {
                match r {
                    Ok(Ok(_)) => (),
                    Ok(Err(err)) => {
                        tracing::error!("Signal handler failed: {err:?}");
                        shutdown_signal.cancel();
                    }
                    Err(err) => tracing::error!("Signal handler panicked: {err}"),
                }
            }
        }
    };
    signals.shutdown().await;
    tracing::info!("Server stopped");
    args.logs.shutdown();
    match result {
        Ok(r) => r,
        Err(e) => anyhow::bail!("Internal error in spawn: {e}"),
    }
}
