use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use jornadas_common::{DEFAULT_HOST, DEFAULT_PORT, DISPATCH_BUFFER, MAX_WRITE_RETRIES};
use jornadas_server::{AppState, DispatchHub, log_events, serve};
use jornadas_storage::{DocumentStore, FileDocumentStore, MemoryDocumentStore};

#[derive(Parser, Debug)]
#[command(name = "jornadas-server", about = "Jornadas — gateway de likes e comunidade")]
struct Args {
    #[arg(long, env = "JORNADAS_HOST", default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, env = "JORNADAS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Segredo dos endpoints de administração. Sem ele, ficam desativados.
    #[arg(long, env = "JORNADAS_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
    /// Documento da comunidade em JSON; em memória quando omitido.
    #[arg(long, env = "JORNADAS_DOCUMENT", value_name = "FILE")]
    document: Option<PathBuf>,
    #[arg(long, default_value_t = DISPATCH_BUFFER)]
    dispatch_buffer: usize,
    #[arg(long, default_value_t = MAX_WRITE_RETRIES)]
    max_retries: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jornadas_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let documents: Arc<dyn DocumentStore> = match args.document {
        Some(ref path) => {
            info!("documento da comunidade em {}", path.display());
            Arc::new(FileDocumentStore::new(path.clone()))
        }
        None => {
            warn!("sem --document: a comunidade fica só em memória");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let hub = DispatchHub::new(args.dispatch_buffer);
    let worker = tokio::spawn(log_events(hub.subscribe()));

    let mut state = AppState::new(documents, hub);
    state.max_retries = args.max_retries;
    match args.admin_token {
        Some(token) => state = state.with_admin_token(token),
        None => warn!("sem JORNADAS_ADMIN_TOKEN: endpoints de administração desativados"),
    }

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state, async {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal recebido");
        }
    })
    .await?;

    // O router (e o hub) já foram largados; o worker termina sozinho
    let _ = worker.await;
    Ok(())
}
