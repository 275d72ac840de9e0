use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node control API")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:3001)
    #[arg(long, global = true, default_value = "http://127.0.0.1:3001")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node's full chain
    Blocks,
    /// Print the node's open peer connections
    Peers,
    /// Mine a block carrying DATA (parsed as JSON, falling back to a plain string)
    Mine {
        data: String,
    },
    /// Ask the node to connect to a peer, e.g. ws://127.0.0.1:6002
    AddPeer {
        peer: String,
    },
}

#[derive(Serialize)]
struct MineIn {
    data: Value,
}

#[derive(Serialize)]
struct PeerIn {
    peer: String,
}

fn parse_payload(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node.trim_end_matches('/');

    let res = match cli.cmd {
        Command::Blocks => client.get(format!("{node}/blocks")).send().await?,
        Command::Peers => client.get(format!("{node}/peers")).send().await?,
        Command::Mine { data } => {
            let body = MineIn {
                data: parse_payload(data),
            };
            client.post(format!("{node}/mineBlock")).json(&body).send().await?
        }
        Command::AddPeer { peer } => {
            client
                .post(format!("{node}/addPeer"))
                .json(&PeerIn { peer })
                .send()
                .await?
        }
    };

    let status = res.status();
    let body = res.text().await?;
    debug!(%status, "node responded");
    println!("status: {}", status);
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if body.is_empty() => {}
        Err(_) => println!("{body}"),
    }
    Ok(())
}
