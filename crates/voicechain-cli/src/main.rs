use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use voicechain_core::archive::SessionArchive;
use voicechain_core::config::Config;

#[derive(Parser)]
#[command(
    name = "voicechain",
    about = "Voice chat backend — chained speech pipeline with session archiving",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (default: 3000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show current configuration
    Config,

    /// Archived session management
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List archived sessions, newest first
    List,
    /// Print a session transcript
    Show { session_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("voicechain.json5"));
    let mut config = Config::load(&config_path)?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.get_or_insert_with(Default::default).port = Some(port);
            }
            tracing::info!("Starting Voicechain server on port {}", config.port());
            let state = Arc::new(voicechain_server::AppState::from_config(config));
            voicechain_server::start_server(state).await?;
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        Commands::Sessions { action } => {
            let archive = SessionArchive::new(config.data_dir());
            match action {
                SessionAction::List => {
                    let sessions = archive.list_sessions().await?;
                    if sessions.is_empty() {
                        println!("No archived sessions");
                    }
                    for summary in sessions {
                        println!(
                            "{}  {}  voice={}  messages={}",
                            summary.session_id,
                            summary.timestamp,
                            summary.voice,
                            summary.conversation_length
                        );
                    }
                }
                SessionAction::Show { session_id } => match archive.load_session(&session_id).await? {
                    Some(session) => {
                        println!("{}", serde_json::to_string_pretty(&session)?);
                    }
                    None => {
                        anyhow::bail!("session {session_id} not found");
                    }
                },
            }
        }
    }

    Ok(())
}
