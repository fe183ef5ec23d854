use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;

pub mod chat;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the chat relay server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Chat with the assistant through a running relay
    Chat {
        /// URL of the relay's chat endpoint
        #[arg(long, default_value = "http://127.0.0.1:2222/api/chat")]
        relay_url: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    let storage_path = env::var("SENSOR_CHAT_STORAGE_PATH").unwrap_or("./".to_string());
    let chat_db_path = format!("{}/chat.db", storage_path.trim_end_matches('/'));

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat { relay_url }) => {
            chat::run(&relay_url, &chat_db_path).await?;
        }
        None => {}
    }

    Ok(())
}
