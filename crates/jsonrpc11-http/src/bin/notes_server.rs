//! # Notes Server
//!
//! Serves the demo notes service over HTTP.
//!
//! ## Usage
//! ```bash
//! cargo run --bin notes-server -- --schema-dir demos/notes-schemas --validate-result
//! ```
//!
//! ```bash
//! curl -X POST http://127.0.0.1:8888/ \
//!   -d '{"version":"1.1","method":"new","params":["buy milk"],"id":1}'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpc11_http::HttpJsonRpcServer;
use jsonrpc11_http::notes::{NoteStore, notes_service};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    bind: SocketAddr,

    /// Endpoint path
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Directory of per-method params/result schemas
    #[arg(short, long)]
    schema_dir: Option<PathBuf>,

    /// Check results against their schemas as well as params
    #[arg(long, default_value = "false")]
    validate_result: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let schemas = match &args.schema_dir {
        Some(dir) => Some(
            jsonrpc11_schema::load_dir(dir)
                .with_context(|| format!("loading schemas from {}", dir.display()))?,
        ),
        None => None,
    };
    info!(
        "Params validation {}",
        if schemas.is_some() { "enabled" } else { "disabled" }
    );

    let service = notes_service(Arc::new(NoteStore::new()), schemas, args.validate_result)?;
    let server = HttpJsonRpcServer::builder(service)
        .bind_address(args.bind)
        .rpc_path(args.path)
        .build();

    server.run().await?;
    Ok(())
}
