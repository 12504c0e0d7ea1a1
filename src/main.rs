use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use clap::{Parser, ValueEnum};
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use optionloader::metrics::metrics_handler;
use optionloader::reader::DEFAULT_TIMEOUT;
use optionloader::store::ConsulOptions;
use optionloader::{
    Backend, ClientLoader, ClientLoaderOptions, ConfigFormat, LoadError, Reader, ReaderError,
    ReaderOptions, ServerLoader, ServerLoaderOptions,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendKind {
    Consul,
    Etcd,
    File,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Client,
    Server,
}

/// Loads the options for one service and serves them for inspection.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where the configuration lives
    #[arg(long, value_enum, default_value = "consul")]
    backend: BackendKind,

    /// Consul agent address
    #[arg(long, default_value = "127.0.0.1:8500")]
    address: String,

    #[arg(long, default_value = "dc1")]
    datacenter: String,

    #[arg(long, default_value = "")]
    namespace: String,

    #[arg(long, default_value = "")]
    partition: String,

    #[arg(long, default_value = "")]
    token: String,

    /// Comma-separated etcd endpoints
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,

    /// Directory holding configuration files (file backend)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Key prefix (backend default when omitted)
    #[arg(long)]
    prefix: Option<String>,

    /// Key template, e.g. "/{{ServerServiceName}}"
    #[arg(long)]
    path_format: Option<String>,

    /// Blob format: json or yaml
    #[arg(long, default_value = "json")]
    format: String,

    /// Fetch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    #[arg(long, value_enum, default_value = "client")]
    role: Role,

    /// Calling service name (client role)
    #[arg(long, default_value = "")]
    client_service: String,

    /// Called service name
    #[arg(long)]
    server_service: String,

    /// Reload interval in seconds; 0 disables reloading
    #[arg(long, default_value_t = 0)]
    refresh_secs: u64,

    /// Print the options once and exit
    #[arg(long)]
    once: bool,

    /// Listening IP address (default: 0.0.0.0)
    #[arg(short, long, default_value = "0.0.0.0")]
    listen_ip: String,

    /// Listening port (default: 8898)
    #[arg(short, long, default_value_t = 8898)]
    listen_port: u16,
}

enum Inspector {
    Client(ClientLoader),
    Server(ServerLoader),
}

impl Inspector {
    fn new(args: &Args) -> Result<Self, ReaderError> {
        let backend = match args.backend {
            BackendKind::Consul => Backend::Consul(ConsulOptions {
                address: args.address.clone(),
                datacenter: args.datacenter.clone(),
                namespace: args.namespace.clone(),
                partition: args.partition.clone(),
                token: args.token.clone(),
            }),
            BackendKind::Etcd => Backend::Etcd {
                nodes: args.nodes.clone(),
            },
            BackendKind::File => Backend::File {
                root: args.root.clone(),
            },
        };
        let format: ConfigFormat = args.format.parse().unwrap_or_default();
        let timeout = Some(Duration::from_secs(args.timeout_secs));

        Ok(match args.role {
            Role::Client => {
                let options = ReaderOptions {
                    prefix: args.prefix.clone(),
                    path_format: args.path_format.clone(),
                    timeout,
                    format,
                    decoder: None,
                };
                let reader = Reader::new(backend, options)?;
                Inspector::Client(ClientLoader::new(
                    args.client_service.clone(),
                    args.server_service.clone(),
                    reader,
                    ClientLoaderOptions::default(),
                ))
            }
            Role::Server => {
                let options = ReaderOptions {
                    prefix: args.prefix.clone(),
                    path_format: args.path_format.clone(),
                    timeout,
                    format,
                    decoder: None,
                };
                let reader = Reader::new(backend, options)?;
                Inspector::Server(ServerLoader::new(
                    args.server_service.clone(),
                    reader,
                    ServerLoaderOptions::default(),
                ))
            }
        })
    }

    async fn load(&self) -> Result<(), LoadError> {
        match self {
            Inspector::Client(loader) => loader.load().await,
            Inspector::Server(loader) => loader.load().await,
        }
    }

    /// One option per line, grouped by family.
    fn render(&self) -> Result<String, LoadError> {
        let mut out = String::new();
        match self {
            Inspector::Client(loader) => {
                let snapshot = loader.snapshot()?;
                for opt in snapshot.suite.iter() {
                    out.push_str(&format!("client {:?}\n", opt));
                }
                for opt in snapshot.stream_suite.iter() {
                    out.push_str(&format!("stream {:?}\n", opt));
                }
                for (name, opt) in snapshot.call_options.iter() {
                    out.push_str(&format!("call[{}] {:?}\n", name, opt));
                }
                for (name, opt) in snapshot.stream_call_options.iter() {
                    out.push_str(&format!("stream-call[{}] {:?}\n", name, opt));
                }
            }
            Inspector::Server(loader) => {
                for opt in loader.suite()?.iter() {
                    out.push_str(&format!("server {:?}\n", opt));
                }
            }
        }
        Ok(out)
    }
}

#[derive(Clone)]
struct AppState {
    inspector: Arc<Inspector>,
}

async fn options_handler(State(state): State<AppState>) -> String {
    state
        .inspector
        .render()
        .unwrap_or_else(|err| format!("{}\n", err))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(
        backend = ?args.backend,
        role = ?args.role,
        server_service = %args.server_service,
        "Starting option inspector"
    );

    let inspector = Arc::new(Inspector::new(&args)?);

    if args.once {
        inspector.load().await?;
        print!("{}", inspector.render()?);
        return Ok(());
    }

    if let Err(err) = inspector.load().await {
        error!(%err, "Initial load failed");
    }

    if args.refresh_secs > 0 {
        let inspector = inspector.clone();
        let period = Duration::from_secs(args.refresh_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = inspector.load().await {
                    warn!(%err, "Refresh failed");
                }
            }
        });
    }

    let app = Router::new()
        .route("/options", get(options_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { inspector });

    let addr: SocketAddr = format!("{}:{}", args.listen_ip, args.listen_port).parse()?;
    info!("Inspector running on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
