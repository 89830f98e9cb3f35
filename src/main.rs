mod cli;

use clap::Parser;
use cli::Cli;
use fve_hash_forge::commands;
use fve_hash_forge::commands::extract::ExtractOptions;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // stdout занят отчётом, логи уходят в stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = ExtractOptions {
        offset: cli.offset,
        out_json: cli.out_json,
        all_copies: cli.all_copies,
    };

    if let Err(e) = commands::extract::run(&cli.image, &options) {
        eprintln!("[!] {}", e);
        std::process::exit(1);
    }
}
