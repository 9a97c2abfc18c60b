//! confsync entry point.

use std::process::ExitCode;

use log::info;

use confsync::config::Config;
use confsync::converge::SaltCall;
use confsync::pipeline;

const USAGE: &str = "\
NAME
    confsync - node-side configuration update and sync client

SYNOPSIS
    confsync [TAG] [-h|--help]

OPTIONS
    TAG            Generate, fetch and activate the configuration named
                   TAG, then run a convergence pass. Without a TAG the
                   currently active configuration is re-applied unchanged.

    -h, --help     Print this help.
";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let tag = match std::env::args().nth(1) {
        Some(arg) if arg == "-h" || arg == "--help" => {
            print!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        other => other,
    };

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("confsync: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Starting configuration sync with config: {:?}", cfg);

    match pipeline::run(&cfg, tag.as_deref(), &SaltCall).await {
        // The convergence engine's own exit code is the process exit code.
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            println!("confsync: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
