use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cinder::config::{self, ServerConfig, ServerRole};
use cinder::connection::{self, FrameReader};
use cinder::context::{MasterContext, ReplicaContext, ServerContext};
use cinder::handshake;
use cinder::rdb;
use cinder::store::Store;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid command line arguments");
            return ExitCode::FAILURE;
        }
    };

    let mut store = Store::new();
    match rdb::load_snapshot(&config.dir, &config.dbfilename).await {
        Ok(entries) => {
            if !entries.is_empty() {
                info!(keys = entries.len(), "loaded snapshot");
            }
            store.absorb_snapshot(entries);
        }
        Err(e) => {
            warn!(error = %e, "failed to load snapshot, starting with an empty store");
        }
    }

    let listener = match TcpListener::bind(("127.0.0.1", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(port = config.port, error = %e, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    let repl_id = config::generate_repl_id();

    let ctx = match config.role.clone() {
        ServerRole::Master => {
            ServerContext::Master(Arc::new(MasterContext::new(config.clone(), repl_id, store)))
        }
        ServerRole::Replica { host, port } => {
            let master_endpoint = format!("{}:{}", host, port);

            let stream = match TcpStream::connect(&master_endpoint).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(%master_endpoint, error = %e, "failed to connect to master");
                    return ExitCode::FAILURE;
                }
            };

            let (read_half, write_half) = stream.into_split();
            let mut reader = FrameReader::new(read_half);
            let writer = Arc::new(Mutex::new(write_half));

            {
                let mut writer_guard = writer.lock().await;
                if let Err(e) =
                    handshake::perform_handshake(&mut reader, &mut *writer_guard, config.port)
                        .await
                {
                    error!(%master_endpoint, error = %e, "replication handshake failed");
                    return ExitCode::FAILURE;
                }
            }

            info!(%master_endpoint, "attached to master");

            let replica = Arc::new(ReplicaContext::new(config.clone(), repl_id, store));

            let loop_replica = Arc::clone(&replica);
            tokio::spawn(async move {
                connection::handle_master_connection(reader, writer, loop_replica, master_endpoint)
                    .await;
            });

            ServerContext::Replica(replica)
        }
    };

    info!(port = config.port, role = ctx.role_name(), "listening");
    connection::serve(listener, ctx).await;

    ExitCode::SUCCESS
}
