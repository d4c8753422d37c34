//! The tableops-resource-runner executable
//!
//! Invokes a resource provider the way an orchestrator would, one operation
//! per run, and prints the provider's answer as JSON.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tableops_resource::{logging, schema::v0};
use tableops_resource_runner::{ResourceProviderClient, ResourceProviderConfig};

mod inputs;

use inputs::InputSources;

fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Commands::Create { provider, inputs } => run_provider(&args, provider, |client| async move {
            print_json(&client.create(inputs.table_inputs()?).await?)
        }),
        Commands::Diff {
            provider,
            id,
            old_json,
            inputs,
        } => run_provider(&args, provider, |client| async move {
            let old = serde_json::from_str::<v0::TableInputs>(old_json)
                .with_context(|| "failed to parse value of --old-json")?;
            print_json(&client.diff(id.clone(), old, inputs.table_inputs()?).await?)
        }),
        Commands::Update {
            provider,
            id,
            old_json,
            inputs,
        } => run_provider(&args, provider, |client| async move {
            let old = serde_json::from_str::<v0::TableState>(old_json)
                .with_context(|| "failed to parse value of --old-json")?;
            print_json(&client.update(id.clone(), old, inputs.table_inputs()?).await?)
        }),
        Commands::Delete {
            provider,
            id,
            inputs,
        } => run_provider(&args, provider, |client| async move {
            client.delete(id.clone(), inputs.table_inputs()?).await?;
            eprintln!("Deleted table {}", id);
            Ok(())
        }),
        Commands::GenerateMan => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        }
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "tableops-resource-runner",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn run_provider<F, Fut>(args: &Args, provider: &ProviderArgs, f: F) -> Result<()>
where
    F: FnOnce(ResourceProviderClient) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    logging::set_up(&logging::Options {
        verbose: args.verbose,
    })?;
    let client = ResourceProviderClient::new(ResourceProviderConfig {
        provider_executable: provider.provider_exe.clone(),
        provider_args: provider.provider_arg.clone(),
    });
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(f(client))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run tableops resource providers by hand
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,
}

#[derive(ClapArgs, Debug)]
struct ProviderArgs {
    /// The executable that implements the resource operations
    #[arg(long)]
    provider_exe: String,

    /// An argument to pass to the provider executable; may be repeated
    #[arg(long, allow_hyphen_values = true)]
    provider_arg: Vec<String>,
}

#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// The (whole) JSON input properties for the table
    ///
    /// This is a JSON object with `name`, `size`, `read_only` and `endpoint`.
    #[arg(long("inputs-json"))]
    input_properties_json: Option<String>,

    /// An individual input property for the table, in JSON format
    #[arg(long("input-json"), short('j'), number_of_values = 2, value_names = &["NAME", "JSON"])]
    input_property_json: Vec<String>,

    /// An individual input property for the table, as a raw string.
    ///
    /// This is equivalent to `--input-json NAME JSON` if JSON is the JSON string formatting of STR.
    #[arg(long("input-str"), short('s'), number_of_values = 2, value_names = &["NAME", "STR"])]
    input_property_str: Vec<String>,

    /// Base URL of the table store, used when the inputs do not contain an `endpoint`
    #[arg(long, env = "TABLEOPS_ENDPOINT")]
    endpoint: Option<String>,
}

impl InputArgs {
    fn table_inputs(&self) -> Result<v0::TableInputs> {
        inputs::table_inputs(&InputSources {
            inputs_json: self.input_properties_json.as_deref(),
            input_json: &self.input_property_json,
            input_str: &self.input_property_str,
            endpoint: self.endpoint.as_deref(),
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a table
    Create {
        #[command(flatten)]
        provider: ProviderArgs,
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Check whether moving from the old to the new inputs requires an update
    Diff {
        #[command(flatten)]
        provider: ProviderArgs,
        /// The id of the table
        #[arg(long)]
        id: String,
        /// The previous input properties, as a JSON object
        #[arg(long)]
        old_json: String,
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Update a table to the new inputs
    Update {
        #[command(flatten)]
        provider: ProviderArgs,
        /// The id of the table
        #[arg(long)]
        id: String,
        /// The previous state: input properties plus `created_at` and `modified_at`, as a JSON object
        #[arg(long)]
        old_json: String,
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Delete a table
    Delete {
        #[command(flatten)]
        provider: ProviderArgs,
        /// The id of the table
        #[arg(long)]
        id: String,
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Generate markdown documentation for tableops-resource-runner
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for tableops-resource-runner
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for tableops-resource-runner
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
