use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier::client::{Client, DEFAULT_SERVER};

/// Sends one GET or multipart upload to a courier server and prints the
/// raw response.
#[derive(Debug, Parser)]
#[command(name = "courier-client")]
struct Cli {
    /// Server to connect to
    #[arg(long, default_value = DEFAULT_SERVER, env = "COURIER_SERVER")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a path, e.g. `/index.html`
    Get { path: String },
    /// Upload a local file
    Post { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let server = url::Url::parse(&cli.server)?;
    let client = Client::new(&server)?;

    let response = match &cli.command {
        Command::Get { path } => client.get(path).await?,
        Command::Post { file } => client.post_file(file).await?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response)?;
    stdout.flush()?;

    Ok(())
}
