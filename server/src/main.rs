use anyhow::Result;
use axum::Router;
use clap::Parser;
use rtindex_core::IndexConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Directory that commits are written to
    #[arg(long, default_value = "./index")]
    index: String,
    /// Restore the in-memory index from this prefix under --index at startup
    #[arg(long)]
    restore_prefix: Option<String>,
    /// JSON index configuration; defaults come from TERMPIPELINES / TERMPIPELINES_SKIP
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig::from_env(),
    };
    let app: Router = build_app(args.index.clone(), args.restore_prefix.as_deref(), config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
