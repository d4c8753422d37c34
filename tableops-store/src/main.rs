use std::{net::IpAddr, path::PathBuf, process::exit, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, CommandFactory as _, Parser, Subcommand};
use tableops_resource::logging;
use tableops_store::{http, Snapshot, TableStore};
use tokio::net::TcpListener;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    match &args.command {
        None => {
            logging::set_up(&logging::Options {
                verbose: args.serve.verbose,
            })?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(serve(&args.serve))
        }
        Some(Commands::GenerateMan) => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        }
        Some(Commands::GenerateMarkdown) => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Some(Commands::GenerateCompletion { shell }) => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "tableops-store", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn serve(options: &ServeArgs) -> Result<()> {
    let store = TableStore::open(Snapshot::new(&options.state_file))
        .with_context(|| "Could not load the table snapshot")?;

    let listener = TcpListener::bind((options.host, options.port))
        .await
        .with_context(|| format!("Could not listen on {}:{}", options.host, options.port))?;
    tracing::info!(
        "table store listening at http://{}",
        listener.local_addr()?
    );

    http::serve(listener, Arc::new(store), shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn handle_result(r: Result<()>) {
    if let Err(e) = r {
        eprintln!("tableops-store error: {:?}", e);
        exit(1);
    }
}

/// Serve the table store over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// The port to listen on
    #[arg(default_value_t = 3000)]
    port: u16,

    /// The address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// The file holding the table snapshot; read at startup, rewritten after every change
    #[arg(long, default_value = "data.json")]
    state_file: PathBuf,

    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate markdown documentation for tableops-store
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for tableops-store
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for tableops-store
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
