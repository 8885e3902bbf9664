use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rates-cli")]
#[command(about = "Command-line client for the USD/MXN rates service", long_about = None)]
struct Cli {
    /// Service base URL.
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Versioned API prefix.
    #[arg(short, long, default_value = "/api/v1")]
    prefix: String,

    /// Correlation ID sent as `x-request-id`.
    #[arg(long)]
    request_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest published rate
    Current,
    /// Rates for the last N business days
    Historical {
        #[arg(short, long, default_value_t = 10)]
        days: u32,
    },
    /// Mean rate over the last N business days
    Average {
        #[arg(short, long, default_value_t = 15)]
        days: u32,
    },
    /// Dependency health report
    Health,
}

impl Commands {
    fn path(&self) -> String {
        match self {
            Commands::Current => "/rates/current".to_string(),
            Commands::Historical { days } => format!("/rates/historical?days={}", days),
            Commands::Average { days } => format!("/rates/average?days={}", days),
            Commands::Health => "/health".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.request_id {
        headers.insert("x-request-id", HeaderValue::from_str(id)?);
    }

    let url = format!(
        "{}{}{}",
        cli.url.trim_end_matches('/'),
        cli.prefix.trim_end_matches('/'),
        cli.command.path()
    );

    let res = client.get(url).headers(headers).send().await?;
    let ok = print_response(res).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
        Ok(true)
    } else {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", rendered);
        Ok(false)
    }
}
