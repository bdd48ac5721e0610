use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use docquery_cli::config::{self, API_KEY_ENV};
use docquery_cli::session::{ChatSession, CleanupNotice, SessionError};
use docquery_core::models::answer::{Answer, Source};
use docquery_gemini::{FileSearchApi, GeminiError};
use eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docquery", version, about = "Chat with a document using Gemini file search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a document and chat about it
    Chat {
        /// Document to index
        file: PathBuf,

        /// Model to answer with (defaults to the configured default)
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
        api_key: String,
    },
    /// List the configured models
    Models,
    /// Show the config file, or write the defaults with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::load_settings()?;

    match cli.command {
        Command::Chat {
            file,
            model,
            api_key,
        } => {
            let mut session = ChatSession::new(settings);
            if let Some(model) = model {
                session.select_model(&model)?;
            }
            run_chat(&mut session, &file, &api_key).await
        }
        Command::Models => {
            for model in &settings.models {
                let marker = if *model == settings.default_model { "*" } else { " " };
                println!("{marker} {model}");
            }
            Ok(())
        }
        Command::Config { init } => {
            if init {
                let path = config::save_settings(&settings)?;
                println!("wrote {}", path.display());
            } else {
                println!("# {}", config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            Ok(())
        }
    }
}

async fn run_chat(session: &mut ChatSession, file: &Path, api_key: &str) -> Result<()> {
    let handle = session.client(api_key)?;
    let api: &dyn FileSearchApi = handle.client();

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre::eyre!("not a file: {}", file.display()))?
        .to_string();
    let bytes = tokio::fs::read(file)
        .await
        .map_err(|e| eyre::eyre!("failed to read {}: {e}", file.display()))?;

    println!("Indexing {file_name} ...");
    let outcome = match session.upload_document(api, &file_name, &bytes).await {
        Ok(outcome) => outcome,
        Err(SessionError::Auth(e)) => return Err(credential_error(e)),
        Err(e) if e.is_timeout() => {
            return Err(eyre::eyre!("indexing did not finish in time: {e}"));
        }
        Err(e) => return Err(e.into()),
    };
    report_notices(&outcome.notices);
    println!(
        "Ready. Model: {}. Type a question, /sources to toggle sources, /clear to finish.",
        session.model()
    );

    let mut show_sources = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/clear" | "/quit" => break,
            "/sources" => {
                show_sources = !show_sources;
                println!("sources {}", if show_sources { "on" } else { "off" });
            }
            prompt => match session.ask(api, prompt).await {
                Ok(answer) => print_answer(&answer, show_sources),
                Err(SessionError::Query(e)) => eprintln!("query failed: {e}"),
                Err(SessionError::Auth(e)) => {
                    session.clear_document(api).await;
                    return Err(credential_error(e));
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    let cleared = session.clear_document(api).await;
    report_notices(&cleared.notices);
    println!("Document cleared.");
    Ok(())
}

fn credential_error(e: GeminiError) -> eyre::Report {
    eyre::eyre!("{e}. Check --api-key or {API_KEY_ENV}")
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}\n", answer.text);
    if !show_sources || answer.sources.is_empty() {
        return;
    }

    println!("Sources:");
    for source in &answer.sources {
        match source {
            Source::File(label) => println!("  file: {label}"),
            Source::Citation(label) => println!("  citation: {label}"),
            Source::GroundingChunk(value) => println!("  chunk: {value}"),
            Source::GroundingSupport(value) => println!("  support: {value}"),
        }
    }
    println!();
}

fn report_notices(notices: &[CleanupNotice]) {
    for notice in notices {
        eprintln!(
            "warning: could not delete store {}: {}",
            notice.store_name, notice.message
        );
    }
}
