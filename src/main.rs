use clap::{Parser, Subcommand};
use commands::{Bench, Dataset, Generate, Solve};

mod commands;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct LpBench {
    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(Generate),
    Dataset(Dataset),
    Solve(Solve),
    Bench(Bench),
}

fn main() {
    let cli = LpBench::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Command::Generate(generate) => generate.generate(),
        Command::Dataset(dataset) => dataset.dataset(),
        Command::Solve(solve) => solve.solve(),
        Command::Bench(bench) => bench.bench(),
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
