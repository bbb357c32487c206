// File: olivia-server/src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use olivia_core::tasks::spawn_conversation_sweep_task;
use olivia_server::api::router;
use olivia_server::{Args, ServerContext};

/// How often idle conversations are swept, capped by the TTL itself.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

fn init_tracing() {
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::from_default_env()
        .add_directive("olivia=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!(
        "Olivia starting. addr={}, llm={}, tz={}",
        args.addr, args.llm_provider, args.timezone
    );

    let ctx = Arc::new(ServerContext::new(&args).await?);

    let ttl = Duration::from_secs(args.conversation_ttl_secs);
    let _sweep = spawn_conversation_sweep_task(
        ctx.conversations.clone(),
        ctx.clock.clone(),
        ttl,
        SWEEP_EVERY.min(ttl).max(Duration::from_secs(1)),
    );

    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("invalid --addr '{}'", args.addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind server listener failed")?;
    info!("Olivia listening on http://{}", addr);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with error")?;

    info!("Main finished. Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {:?}", e);
    }
    info!("Shutdown signal received");
}
