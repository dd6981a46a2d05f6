//! ACMG command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use octofhir_acmg::cli::{criteria, evaluate, output, validate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ACMG variant classification tool
#[derive(Parser)]
#[command(name = "acmg")]
#[command(author, version, about = "ACMG/AMP variant classification tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, pretty, table)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate variant records and classify every phenotype
    Evaluate {
        /// Record file (JSON object or array of objects)
        record: PathBuf,

        /// Rule-set file (default: bundled standard rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Engine configuration file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prior classifications (JSON) used by history lookups
        #[arg(short = 'H', long)]
        history: Option<PathBuf>,

        /// Emit the full report with diagnostics
        #[arg(long)]
        report: bool,
    },

    /// Validate rule-set files
    Validate {
        /// Rule-set files (default: bundled standard rules)
        files: Vec<PathBuf>,

        /// Engine configuration to check against each rule set
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// List the criteria of a rule set
    Criteria {
        /// Rule-set file (default: bundled standard rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Evaluate {
            record,
            rules,
            config,
            history,
            report,
        } => {
            let config = evaluate::EvaluateConfig {
                record,
                rules,
                config,
                history,
                report,
                verbose: cli.verbose,
                output_format: cli.format,
                output_file: cli.output,
            };
            evaluate::evaluate(config).await
        }

        Commands::Validate { files, config, strict } => {
            let config = validate::ValidateConfig {
                files,
                config,
                strict,
                verbose: cli.verbose,
            };
            validate::validate(config).await
        }

        Commands::Criteria { rules } => {
            let config = criteria::CriteriaConfig {
                rules,
                output_format: cli.format,
                output_file: cli.output,
            };
            criteria::list(config).await
        }
    }
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(&cli.color);
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
