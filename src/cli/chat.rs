use std::io::{self, Write};

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use crate::chat::{
    Action, ChatClient, ConversationState, ExchangeOutcome, Phase, SqliteThreadStore,
};

fn init_logging() {
    // Logs go to stderr so they don't interleave with streamed text
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn render(state: &ConversationState, action: &Action) {
    match action {
        Action::Append(text) => {
            print!("{}", text);
            let _ = io::stdout().flush();
        }
        Action::Transition(_) => match state.phase() {
            Phase::Thinking => eprintln!("[thinking]"),
            Phase::ToolCall => {
                eprintln!("[calling {}]", state.tool_name().unwrap_or("tool"));
            }
            Phase::Streaming | Phase::Idle => {}
        },
        Action::ThreadId(_) | Action::Done => {}
    }
}

pub async fn run(relay_url: &str, chat_db_path: &str) -> Result<()> {
    init_logging();

    let mut rl = DefaultEditor::new()?;
    let store = SqliteThreadStore::open(chat_db_path)?;
    let mut state = ConversationState::new(Box::new(store));
    let client = ChatClient::new(relay_url);

    if let Some(thread_id) = state.thread_identifier() {
        println!("Resuming conversation thread {}", thread_id);
    }
    println!("Type /new to start a new conversation, Ctrl-C cancels a response.");

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                match line {
                    "" => continue,
                    "/new" => {
                        state.start_new_conversation();
                        println!("Started a new conversation.");
                        continue;
                    }
                    "/dismiss" => {
                        state.dismiss_error();
                        continue;
                    }
                    _ => {}
                }
                let _ = rl.add_history_entry(line);

                let cancel = CancellationToken::new();
                let watcher = tokio::spawn({
                    let cancel = cancel.clone();
                    async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    }
                });

                let outcome = client.send(&mut state, line, cancel, render).await?;
                watcher.abort();
                println!();

                match outcome {
                    ExchangeOutcome::Completed => {}
                    ExchangeOutcome::Cancelled => eprintln!("[cancelled]"),
                    ExchangeOutcome::Failed(_) => {
                        if let Some(reason) = state.error() {
                            eprintln!("Error: {} (/dismiss to clear)", reason);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
