//! Command line tool for training

use std::path::PathBuf;

use anyhow::anyhow;
use pico_args::Arguments;
use vuln_detect::{
    backend::{device, TrainingBackend},
    pipelines::text_classification::train,
    settings::{ensure_output_dirs, RunParams, Settings},
};

const HELP: &str = "\
Usage: train --config SETTINGS [OPTIONS]

Options:
  -h, --help           Print help
  -c, --config         The YAML settings file
  -d, --data-dir       The dataset directory (defaults to 'data')
  -o, --output-dir     The output directory (defaults to 'output')
  -s, --seed           The partitioning seed (defaults to 1337)
  -v, --verbose        Log progress information
  --cuda               Train on the first CUDA device (requires the 'tch' feature)
";

#[derive(Debug)]
struct Args {
    config: PathBuf,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    seed: Option<u64>,
    verbose: bool,
    cuda: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs
                .value_from_str(["-c", "--config"])
                .map_err(|e| match e {
                    pico_args::Error::MissingOption(_) => {
                        anyhow!("Missing required option: --config")
                    }
                    _ => anyhow!("{}", e),
                })?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            output_dir: pargs.opt_value_from_str(["-o", "--output-dir"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?,
            verbose: pargs.contains(["-v", "--verbose"]),
            cuda: pargs.contains("--cuda"),
        };

        Ok(Some(args))
    }

    fn run_params(&self) -> RunParams {
        let defaults = RunParams::default();

        RunParams {
            data_dir: self.data_dir.clone().unwrap_or(defaults.data_dir),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            seed: self.seed.unwrap_or(defaults.seed),
            verbose: self.verbose,
            trained_model: None,
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();

    builder.filter_level(if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    });

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    init_logging(args.verbose);

    let settings = Settings::load(&args.config)?;
    let params = args.run_params();

    ensure_output_dirs(&settings, &params)?;

    let summary = train::<TrainingBackend>(&settings, &params, device(args.cuda)).await?;

    println!(
        "Trained {} for {} epochs",
        summary.model,
        summary.history.len()
    );

    for checkpoint in &summary.checkpoints {
        println!("Checkpoint: {}", checkpoint.display());
    }

    println!("Epoch log: {}", summary.log_file.display());

    Ok(())
}
