use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tabiji::client::ChatClient;
use tabiji::concierge::Concierge;
use tabiji::config::AppConfig;
use tabiji::language::Language;
use tabiji::llm::gateways::OpenAIGateway;
use tabiji::llm::LlmBroker;
use tabiji::reply::Location;
use tabiji::server::{self, AppState};
use tabiji::session::{ConversationSession, Responder};
use tabiji::transcription::{AudioUpload, Transcriber, WhisperTranscriber};
use tabiji::weather::OpenWeatherClient;
use tabiji::TabijiError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "tabiji", version, about = "Japan travel & style concierge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the chat and transcription API.
    Serve {
        /// Address to listen on, overrides BIND_ADDR.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Chat with the concierge in the terminal.
    Chat {
        /// Base URL of a running server; without it the concierge runs in-process.
        #[arg(long)]
        server: Option<String>,

        /// Reply language, "en" or "jp".
        #[arg(long, default_value = "en")]
        language: Language,
    },

    /// Transcribe an audio file.
    Transcribe {
        path: PathBuf,

        #[arg(long)]
        server: Option<String>,
    },
}

impl Command {
    /// Default log filter when RUST_LOG is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Command::Serve { .. } => "info,tabiji=debug,tower_http=debug",
            _ => "warn",
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let config = AppConfig::from_env()?;
                let (responder, transcriber) = in_process(&config)?;
                let addr = bind.unwrap_or_else(|| config.bind_addr.clone());

                info!(model = %config.chat_model, "Starting tabiji server");
                server::serve(&addr, Arc::new(AppState::new(responder, transcriber))).await?;
            }
            Command::Chat { server, language } => {
                let (responder, transcriber) = match server {
                    Some(url) => remote(&url)?,
                    None => in_process(&AppConfig::from_env()?)?,
                };
                let session = ConversationSession::new(responder)
                    .with_transcriber(transcriber)
                    .with_language(language);
                repl(&session).await?;
            }
            Command::Transcribe { path, server } => {
                let transcriber = match server {
                    Some(url) => remote(&url)?.1,
                    None => in_process(&AppConfig::from_env()?)?.1,
                };
                let audio = AudioUpload::from_path(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                println!("{}", transcriber.transcribe(audio).await?);
            }
        }

        Ok(())
    }
}

type Backends = (Arc<dyn Responder>, Arc<dyn Transcriber>);

fn in_process(config: &AppConfig) -> tabiji::Result<Backends> {
    let gateway = Arc::new(OpenAIGateway::with_config(config.openai_config()?)?);
    let weather = Arc::new(OpenWeatherClient::new(config.openweather_config())?);
    let broker = LlmBroker::new(config.chat_model.clone(), gateway.clone())
        .with_max_tool_rounds(config.max_tool_rounds);

    let responder: Arc<dyn Responder> = Arc::new(Concierge::new(broker, weather));
    let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::new(gateway, config.transcription_model.clone()));
    Ok((responder, transcriber))
}

fn remote(url: &str) -> tabiji::Result<Backends> {
    let client = Arc::new(ChatClient::new(url)?);
    info!(server = client.base_url(), "Using remote concierge");
    let responder: Arc<dyn Responder> = client.clone();
    let transcriber: Arc<dyn Transcriber> = client;
    Ok((responder, transcriber))
}

const HELP: &str = "Commands: /lang en|jp, /new, /voice PATH, /map. Empty line exits.";

async fn repl(session: &ConversationSession) -> anyhow::Result<()> {
    println!("{HELP}");
    print_suggestions(session.suggestions().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let before = session.current_location().await;
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/lang", arg) => match arg.trim().parse::<Language>() {
                Ok(language) => {
                    session.set_language(language).await;
                    println!("Language: {language}");
                }
                Err(e) => println!("{e}"),
            },
            ("/new", _) => {
                session.reset().await;
                println!("Started a new chat.");
                print_suggestions(session.suggestions().await);
            }
            ("/map", _) => print_location(&session.current_location().await),
            ("/voice", arg) => match AudioUpload::from_path(arg.trim()).await {
                Ok(audio) => match session.submit_voice(audio).await {
                    Ok(Some(reply)) => println!("{}", reply.text()),
                    Ok(None) => println!("(no speech detected)"),
                    Err(e) => println!("Voice input failed: {e}"),
                },
                Err(e) => println!("Cannot read {}: {e}", arg.trim()),
            },
            _ => match session.submit(line).await {
                Ok(reply) => println!("{}", reply.text()),
                Err(TabijiError::SessionBusy(_)) => println!("Still waiting for the previous reply."),
                Err(e) => println!("{e}"),
            },
        }

        let after = session.current_location().await;
        if after != before {
            print_location(&after);
        }
    }

    Ok(())
}

fn print_suggestions(suggestions: &[&str]) {
    for suggestion in suggestions {
        println!("  * {suggestion}");
    }
}

fn print_location(location: &Location) {
    println!("[map] {} ({}, {}) {}", location.name, location.lat, location.lon, location.map_url());
}
