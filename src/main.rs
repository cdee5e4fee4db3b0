// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use gazecheck::cli::args::{Cli, Commands};
use gazecheck::cli::watch::run_watch;
use gazecheck::error;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => {
            if let Err(e) = run_watch(&args) {
                error!("{e}");
                process::exit(1);
            }
        }
    }
}
