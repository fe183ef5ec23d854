use anyhow::Result;
use sensor_chat::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
