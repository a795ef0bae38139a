//! Intent pipeline CLI
//!
//! Drives a conversation from the terminal and prints widget cards as they
//! change.
//!
//! # Usage
//!
//! ```bash
//! # Chat with the assistant; intents it emits are executed
//! EXECUTOR_URL=http://localhost:8787/invoke vox_intents chat
//!
//! # Same, with a custom behaviour prompt. `/reset` clears the history.
//! vox_intents chat --instructions prompt.txt
//!
//! # Replay assistant transcripts, one per line
//! echo '{"intent":"balance"}' | vox_intents transcript
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use vox_agentic::{create_llm_client_for, IntentAssistant, LlmClient};
use vox_intents::render::{render_message, render_widget};
use vox_intents::{ClassifierMode, Conversation, Dispatcher, Finalized, MessageId, SessionConfig};

#[derive(Parser)]
#[command(name = "vox_intents")]
#[command(version = "0.1.0")]
#[command(about = "Extract, execute and track blockchain intents from assistant transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network label for balance cards (overrides NETWORK_ID)
    #[arg(long, global = true)]
    network: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Type messages to the assistant
    Chat {
        /// File holding the assistant's behaviour prompt
        #[arg(long)]
        instructions: Option<PathBuf>,
    },

    /// Treat each input line as a finalized assistant transcript
    Transcript {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = SessionConfig::from_env()?;
    if let Some(network) = cli.network {
        config.network_id = network;
    }

    let needs_llm =
        matches!(cli.command, Commands::Chat { .. }) || config.classifier == ClassifierMode::Llm;
    let llm: Option<Arc<dyn LlmClient>> = if needs_llm {
        Some(create_llm_client_for(config.backend)?)
    } else {
        None
    };

    let dispatcher = Dispatcher::from_config(&config, llm.clone())?;
    let mut session = Session {
        conversation: Conversation::new(Arc::new(dispatcher)),
        network_label: config.network_label(),
        watchers: Vec::new(),
    };

    match cli.command {
        Commands::Chat { instructions } => {
            let client = llm.context("chat mode needs an LLM client")?;
            let assistant = match instructions {
                Some(path) => {
                    let prompt = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    IntentAssistant::with_instructions(client, &prompt)
                }
                None => IntentAssistant::new(client),
            };
            let input = BufReader::new(tokio::io::stdin());
            chat(&mut session, assistant, input).await?;
        }
        Commands::Transcript { file } => match file {
            Some(path) => {
                let f = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                replay(&mut session, BufReader::new(f)).await?;
            }
            None => replay(&mut session, BufReader::new(tokio::io::stdin())).await?,
        },
    }

    session
        .finish(config.executor_timeout + Duration::from_secs(5))
        .await;
    Ok(())
}

// =============================================================================
// MODES
// =============================================================================

async fn chat<R>(session: &mut Session, mut assistant: IntentAssistant, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let status = session.conversation.push_status("Connected. Type a request, empty line to quit.");
    session.print_message(status);

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            break;
        }
        if text == "/reset" {
            assistant.reset();
            let id = session.conversation.push_status("Assistant history cleared.");
            session.print_message(id);
            continue;
        }
        session.conversation.push_user(text);

        match assistant.respond(text).await {
            Ok(reply) => session.assistant_reply(&reply)?,
            Err(e) => {
                let id = session
                    .conversation
                    .push_status(&format!("Assistant unavailable: {:#}", e));
                session.print_message(id);
            }
        }
    }
    Ok(())
}

async fn replay<R>(session: &mut Session, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        session.assistant_reply(&line)?;
    }
    Ok(())
}

// =============================================================================
// SESSION
// =============================================================================

struct Session {
    conversation: Conversation,
    network_label: String,
    watchers: Vec<JoinHandle<()>>,
}

impl Session {
    fn assistant_reply(&mut self, text: &str) -> Result<()> {
        let (id, outcome) = self.conversation.push_assistant(text)?;
        self.print_message(id);
        if let Finalized::Intent { .. } = outcome {
            self.watch(id);
        }
        Ok(())
    }

    fn print_message(&self, id: MessageId) {
        if let Some(message) = self.conversation.message(id) {
            println!("{}", render_message(message));
        }
    }

    /// Print the widget now and again on every change
    fn watch(&mut self, id: MessageId) {
        let Some(widget) = self.conversation.widget(id) else {
            return;
        };
        println!("{}", render_widget(&widget.snapshot(), &self.network_label));

        let mut rx = widget.subscribe();
        let network = self.network_label.clone();
        self.watchers.push(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let card = render_widget(&rx.borrow_and_update(), &network);
                println!("{}", card);
            }
        }));
    }

    /// Wait for outstanding widgets, then dispose them all
    async fn finish(self, limit: Duration) {
        let pending = self
            .conversation
            .widgets()
            .map(|(_, widget)| widget.settled())
            .collect::<Vec<_>>();
        for settled in pending {
            if tokio::time::timeout(limit, settled).await.is_err() {
                eprintln!("Gave up waiting for a widget after {}s", limit.as_secs());
                break;
            }
        }

        drop(self.conversation);
        for watcher in self.watchers {
            let _ = watcher.await;
        }
    }
}
