use std::env;
use std::path::PathBuf;

use crate::config::PipelineConfig;

#[derive(Debug, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub skip_regressions: bool,
    pub help: bool,
}

impl CliOptions {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(dir) = &self.out_dir {
            config.output.dir.clone_from(dir);
        }
        if self.skip_regressions {
            config.regression.enabled = false;
        }
    }
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions::default();

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--data-dir" => {
                i += 1;
                let dir = args.next_or_err(i, "missing value for --data-dir (expected a directory)")?;
                if opts.data_dir.replace(PathBuf::from(dir)).is_some() {
                    return Err("--data-dir provided more than once".to_string());
                }
            }
            "--out-dir" => {
                i += 1;
                let dir = args.next_or_err(i, "missing value for --out-dir (expected a directory)")?;
                if opts.out_dir.replace(PathBuf::from(dir)).is_some() {
                    return Err("--out-dir provided more than once".to_string());
                }
            }
            "--skip-regressions" => opts.skip_regressions = true,
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("csi-panel: CSI interconnection panel and subsidy regressions");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  csi-panel [--config <path>] [--data-dir <dir>] [--out-dir <dir>] [--skip-regressions]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>       Load pipeline settings from a TOML file");
    eprintln!("  --data-dir <dir>      Directory relative input paths resolve against (default: data)");
    eprintln!("  --out-dir <dir>       Output directory (default: out)");
    eprintln!("  --skip-regressions    Only write the cleaned sample and the panel");
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("Verbosity is controlled with RUST_LOG (default: info).");
}
