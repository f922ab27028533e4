//! Command line tool for evaluating a trained model on the test set

use std::path::PathBuf;

use anyhow::anyhow;
use pico_args::Arguments;
use vuln_detect::{
    backend::{device, Backend},
    pipelines::text_classification::infer,
    settings::{ensure_output_dirs, RunParams, Settings},
};

const HELP: &str = "\
Usage: infer --config SETTINGS --model CHECKPOINT [OPTIONS]

Options:
  -h, --help           Print help
  -c, --config         The YAML settings file
  -m, --model          The trained model checkpoint (.mpk)
  -d, --data-dir       The dataset directory (defaults to 'data')
  -o, --output-dir     Where results are written (defaults to 'output')
  -s, --seed           The partitioning seed used for training (defaults to 1337)
  -v, --verbose        Log progress information
  --cuda               Run on the first CUDA device (requires the 'tch' feature)
";

#[derive(Debug)]
struct Args {
    /// Prints the usage menu
    help: bool,

    /// The settings file
    config: Option<PathBuf>,

    /// The trained model checkpoint
    model: Option<PathBuf>,

    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    seed: Option<u64>,
    verbose: bool,
    cuda: bool,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    let args = Args {
        help: pargs.contains(["-h", "--help"]),
        config: pargs.opt_value_from_str(["-c", "--config"])?,
        model: pargs.opt_value_from_str(["-m", "--model"])?,
        data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
        output_dir: pargs.opt_value_from_str(["-o", "--output-dir"])?,
        seed: pargs.opt_value_from_str(["-s", "--seed"])?,
        verbose: pargs.contains(["-v", "--verbose"]),
        cuda: pargs.contains("--cuda"),
    };

    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let config = args
        .config
        .as_ref()
        .ok_or_else(|| anyhow!("Missing required option: --config"))?;

    let settings = Settings::load(config)?;

    let defaults = RunParams::default();
    let params = RunParams {
        data_dir: args.data_dir.unwrap_or(defaults.data_dir),
        output_dir: args.output_dir.unwrap_or(defaults.output_dir),
        seed: args.seed.unwrap_or(defaults.seed),
        verbose: args.verbose,
        trained_model: args.model,
    };

    ensure_output_dirs(&settings, &params)?;

    let Some(evaluation) = infer::<Backend>(&settings, &params, device(args.cuda)).await? else {
        println!("No trained model to evaluate, skipping.");

        return Ok(());
    };

    println!("Accuracy: {:.4}", evaluation.accuracy);
    println!("Confusion matrix:\n{}", evaluation.confusion_matrix);
    println!("Classification report:\n{}", evaluation.report);
    println!("Results: {}", evaluation.result_file.display());

    Ok(())
}
