use std::process::ExitCode;

use clap::Parser;

use rasterpad::cli::{self, CliArgs};
use rasterpad::logger;
use rasterpad::settings::EditorSettings;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    let settings = EditorSettings::load();
    cli::run(args, &settings)
}
