//! csi-panel entry point: CLI wiring and config-driven pipeline run.

use std::process;

use csi_panel::cli::{parse_args, print_usage};
use csi_panel::config::PipelineConfig;
use csi_panel::pipeline::run_pipeline;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            process::exit(1);
        }
    };
    if cli.help {
        print_usage();
        return;
    }

    // --config takes priority over the built-in layout
    let mut config = if let Some(ref path) = cli.config {
        match PipelineConfig::from_toml_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        PipelineConfig::csi_default()
    };
    cli.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    match run_pipeline(&config) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
