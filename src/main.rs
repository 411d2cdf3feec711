use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_call_agent::{
    create_router, AppState, BackendClient, CallClassifier, CallLauncher, Config, KnowledgeBase,
    NatsConnector, OpenAiClient, SessionServices,
};

#[derive(Parser)]
#[command(name = "voice-call-agent", version, about = "Voice call agent session manager")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/call-agent")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,
    /// Run a single call session and print its report
    Call {
        #[arg(long)]
        call_id: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_services(cfg: &Config) -> Result<SessionServices> {
    let backend = Arc::new(
        BackendClient::from_config(&cfg.backend)?
            .context("backend.url must be set to fetch agent configuration")?,
    );
    let inference = Arc::new(OpenAiClient::new(&cfg.inference)?);

    Ok(SessionServices {
        directory: backend.clone(),
        classifier: Arc::new(CallClassifier::new(
            inference.clone(),
            cfg.inference.timeout(),
        )),
        analytics: Some(backend.clone()),
        knowledge: Some(Arc::new(KnowledgeBase::new(
            inference,
            backend,
            cfg.knowledge_base.search_limit,
        ))),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    init_tracing(cfg.service.log_json);

    info!("Voice Call Agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let services = build_services(&cfg)?;
    let connector = NatsConnector::connect(
        &cfg.nats.url,
        &cfg.service.name,
        cfg.nats.request_timeout(),
    )
    .await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let launcher = CallLauncher::new(
                Arc::new(connector),
                services,
                cfg.monitor.to_monitor_config(),
            );
            let app = create_router(AppState::new(launcher));

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP server listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Command::Call { call_id } => {
            let launcher = CallLauncher::new(
                Arc::new(connector),
                services,
                cfg.monitor.to_monitor_config(),
            );
            let session = launcher.create_session(&call_id).await?;
            let report = session.run().await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
