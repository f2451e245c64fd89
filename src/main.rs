use clap::{Parser, Subcommand};
use miette::{miette, Result};
use std::path::PathBuf;

use js2ts_rs::cli;
use js2ts_rs::options::DriverFlavor;

#[derive(Parser)]
#[command(name = "js2ts")]
#[command(about = "Convert prototype-based factory modules into class-based TypeScript modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one source file, writing the result next to it
    Convert {
        /// Input source file
        input: PathBuf,

        /// Factory convention of the input
        #[arg(long, value_enum)]
        flavor: Option<DriverFlavor>,

        /// JSON options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the result instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Convert every source file under a directory
    Batch {
        /// Root directory
        dir: PathBuf,

        /// Factory convention of the inputs
        #[arg(long, value_enum)]
        flavor: Option<DriverFlavor>,

        /// JSON options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Convert without writing any output
        #[arg(long)]
        check: bool,
    },

    /// Dump the partitioned token stream and block table as JSON
    Partition {
        /// Input source file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            flavor,
            config,
            stdout,
        } => {
            let options = cli::load_options(config.as_deref(), flavor)?;
            cli::convert::convert(&input, options, stdout)?;
            Ok(())
        }
        Commands::Batch {
            dir,
            flavor,
            config,
            check,
        } => {
            let options = cli::load_options(config.as_deref(), flavor)?;
            let summary = cli::batch::batch(&dir, options, check)?;
            if summary.failed > 0 {
                return Err(miette!(
                    "{} of {} files failed to convert",
                    summary.failed,
                    summary.total()
                ));
            }
            Ok(())
        }
        Commands::Partition { input } => {
            cli::partition::partition(&input)?;
            Ok(())
        }
    }
}
