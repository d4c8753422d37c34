use anyhow::{Context, Result};
use clap::Parser;
use tableops_resource::{framework::run_main, logging};

mod client;
mod provider;

#[tokio::main]
async fn main() {
    if let Err(e) = set_up() {
        eprintln!("tableops-resources-table error: {:?}", e);
        std::process::exit(1);
    }
    let client = match client::StoreClient::new() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("tableops-resources-table error: could not build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    run_main(provider::TableProvider::new(client)).await
}

fn set_up() -> Result<()> {
    let args = Args::parse();
    logging::set_up(&logging::Options {
        verbose: args.verbose,
    })
    .with_context(|| "Could not set up logging")
}

/// Resource provider for tables held by a tableops store
///
/// Reads one request from stdin and writes one response to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}
