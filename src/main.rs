use anyhow::{Context, Result};
use clap::Parser;
use redislike::{serve, Config, Store};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redislike=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to start the server on {addr}"))?;
    tracing::info!("listening on {}", addr);

    let store = Store::new();
    serve(listener, store, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}
