use clap::Parser;

use rasterfe::cli::{self, CliArgs};
use rasterfe::logger;

fn main() -> std::process::ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init(args.log_file.clone(), args.log_level());
    log::info!("RasterFE {} starting", env!("CARGO_PKG_VERSION"));

    cli::run(args)
}
