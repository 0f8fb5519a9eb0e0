use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding circuits.json, raffles.json and config.json
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Championship, remaining circuits and calendar
    Status,

    /// Validate the data files
    Check,
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Command::Status => inspect::status(&args.data_dir).map(|report| print!("{report}")),
        Command::Check => inspect::check(&args.data_dir).map(|report| print!("{report}")),
    };

    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
