//! treeforge CLI
//!
//! Developer tool for compiling and checking tree model projects.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// treeforge - compile decision-tree models to Java scoring units
#[derive(Parser)]
#[command(name = "treeforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "treeforge.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new treeforge project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Check every model without writing sources
    Validate,

    /// Compile models to Java sources
    Compile {
        /// Compile a specific model only
        #[arg(short, long)]
        model: Option<String>,

        /// Override the package from treeforge.yaml
        #[arg(short, long)]
        package: Option<String>,

        /// Override the output directory from treeforge.yaml
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Score JSON records with the interpreter
    Score {
        /// Model name
        model: String,

        /// A single JSON record
        #[arg(short, long, conflicts_with = "input")]
        record: Option<String>,

        /// File with one JSON record per line
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Compile {
            model,
            package,
            output,
        } => {
            commands::compile::run(
                &cli.config,
                model.as_deref(),
                package.as_deref(),
                output.as_deref(),
            )?;
        }
        Commands::Score {
            model,
            record,
            input,
        } => {
            commands::score::run(&cli.config, &model, record.as_deref(), input.as_deref())?;
        }
    }

    Ok(())
}
