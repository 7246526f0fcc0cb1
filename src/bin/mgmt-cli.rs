use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "mgmt-cli")]
#[command(about = "Client for the remote management connector", long_about = None)]
struct Cli {
    /// Connector base URL, or the registry URL for `lookup`
    #[arg(short, long, default_value = "http://localhost:9999")]
    url: String,

    #[arg(long)]
    user: Option<String>,

    #[arg(long, requires = "user")]
    password: Option<String>,

    /// Accept self-signed connector certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the connector URL through the registry
    Lookup,
    /// Show the connection identity assigned by the connector
    Connection,
    /// List entry domains
    Domains,
    /// List entry names
    Entries,
    /// Show the attributes of one entry
    Get { name: String },
    /// Register an entry
    Create {
        name: String,
        /// Attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        attributes: String,
    },
    /// Unregister an entry
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Lookup => client.get(format!("{base}/lookup/mgmt")),
        Commands::Connection => client.get(format!("{base}/connection")),
        Commands::Domains => client.get(format!("{base}/domains")),
        Commands::Entries => client.get(format!("{base}/entries")),
        Commands::Get { name } => client.get(format!("{base}/entries/{name}")),
        Commands::Create { name, attributes } => {
            let attributes: Map<String, Value> = serde_json::from_str(&attributes)?;
            client
                .post(format!("{base}/entries"))
                .json(&serde_json::json!({ "name": name, "attributes": attributes }))
        }
        Commands::Delete { name } => client.delete(format!("{base}/entries/{name}")),
    };
    let request = match cli.user {
        Some(user) => request.basic_auth(user, cli.password),
        None => request,
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: connector returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
