use clap::{Parser, Subcommand};
use keyval::sdk;
use keyval::sdk::discovery::{ADDR_ENV, DEFAULT_ENDPOINT};

#[derive(Parser)]
#[command(author, version, about = "Keyval command-line client", long_about = None)]
struct Cli {
    /// Server endpoint, `tcp://host:port` or `udp://host:port`
    #[arg(short, long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    Get { key: String },
    Set { key: String, value: String },
    Del { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let endpoint = cli
        .addr
        .or_else(|| std::env::var(ADDR_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let store = sdk::connect(&endpoint).await?;

    let result = match cli.command {
        Commands::Get { key } => store.select(&key).await?,
        Commands::Set { key, value } => store.insert(&key, value.as_bytes()).await?,
        Commands::Del { key } => store.delete(&key).await?,
    };

    println!("{:?} ({})", result.status, result.duration);
    if !result.value.is_empty() {
        println!("{}", String::from_utf8_lossy(&result.value));
    }
    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
