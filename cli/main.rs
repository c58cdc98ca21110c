#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use dxscore::config::EvaluationConfig;
use dxscore::data::load_evaluation_inputs;
use dxscore::metrics::{DetailedMetrics, EvaluationReport, WeightSource, evaluate_detailed};
use dxscore::progress::LogProgress;
use dxscore::types::ClassList;
use dxscore::weights::{WeightExport, WeightFormat, WeightTable};

#[derive(Args)]
pub struct EvaluateArgs {
    /// Ground-truth labels: TSV with one 0/1 column per class
    #[arg(value_name = "TRUTH")]
    pub truth: PathBuf,

    /// Binary predictions: TSV with one 0/1 column per class
    #[arg(value_name = "BINARY")]
    pub binary: PathBuf,

    /// Scalar predictions: TSV with one score column per class
    #[arg(value_name = "SCALAR")]
    pub scalar: PathBuf,

    /// Challenge weight table (CSV); overrides `weights_path` of the config file
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Evaluation settings (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Class predicted by the reference classifier
    #[arg(long)]
    pub default_class: Option<String>,

    /// Beta of the F-beta and G-beta measures
    #[arg(long)]
    pub beta: Option<f64>,

    /// Classes to evaluate, in order; defaults to the columns of TRUTH
    #[arg(long, value_delimiter = ',')]
    pub classes: Option<Vec<String>>,

    /// Write per-class metrics to this TSV file
    #[arg(long)]
    pub per_class: Option<PathBuf>,

    /// Write the full report to this TOML file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Sweep classes on a single thread
    #[arg(long)]
    pub serial: bool,
}

#[derive(Args)]
pub struct WeightsArgs {
    /// Challenge weight table (CSV)
    #[arg(value_name = "WEIGHTS")]
    pub weights: PathBuf,

    /// Restrict and reorder the table to these classes
    #[arg(long, value_delimiter = ',')]
    pub classes: Option<Vec<String>>,

    /// Output format: dense (np) or labeled (pd)
    #[arg(long, default_value = "dense")]
    pub format: String,
}

#[derive(Parser)]
#[command(
    name = "dxscore",
    about = "Scoring engine for multi-label ECG diagnosis classifiers",
    long_about = "Computes AUROC, AUPRC, accuracy, F-measure, F-beta, G-beta and the \
                 severity-weighted challenge score of a multi-label classifier."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate classifier outputs against ground truth
    #[command(about = "Evaluate predictions (outputs: summary, optional per-class TSV and report)")]
    Evaluate(EvaluateArgs),

    /// Print the weight matrix for a set of classes
    #[command(about = "Resolve and print a challenge weight table")]
    Weights(WeightsArgs),

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Evaluate(args)) => evaluate(args),
        Some(Commands::Weights(args)) => print_weights(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|_| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    println!("dxscore {version}");
    match option_env!("DXSCORE_RELEASE_TAG") {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }
}

fn resolve_config(args: &EvaluateArgs) -> Result<EvaluationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::load(path)?,
        None => EvaluationConfig::default(),
    };
    if let Some(class) = &args.default_class {
        config.default_class = class.clone();
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    if args.serial {
        config.parallel = false;
    }
    if let Some(path) = &args.weights {
        config.weights_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    let weights_path = config
        .weights_path
        .clone()
        .ok_or("no weight table given; pass --weights or set weights_path in the config file")?;
    let table = WeightTable::load(&weights_path)?;

    let classes = args.classes.map(ClassList::new).transpose()?;
    let inputs = load_evaluation_inputs(&args.truth, &args.binary, &args.scalar, classes)?;
    log::info!(
        "Evaluating {} records over {} classes",
        inputs.num_records(),
        inputs.num_classes()
    );

    let detailed = evaluate_detailed(
        &inputs,
        WeightSource::Table(&table),
        &config,
        &mut LogProgress,
    )?;
    print_summary(&detailed);

    if let Some(path) = &args.per_class {
        save_per_class(path, &detailed)?;
        println!("Per-class metrics written to '{}'", path.display());
    }
    if let Some(path) = &args.report {
        EvaluationReport::new(&config, inputs.num_records(), &detailed).save(path)?;
        println!("Report written to '{}'", path.display());
    }
    Ok(())
}

fn print_summary(detailed: &DetailedMetrics) {
    let summary = detailed.summary();
    println!("AUROC\t{:.4}", summary.macro_auroc);
    println!("AUPRC\t{:.4}", summary.macro_auprc);
    println!("Accuracy\t{:.4}", summary.accuracy);
    println!("F-measure\t{:.4}", summary.macro_f_measure);
    println!("F-beta (beta={})\t{:.4}", detailed.beta, summary.macro_f_beta);
    println!("G-beta (beta={})\t{:.4}", detailed.beta, summary.macro_g_beta);
    println!("Challenge metric\t{:.4}", summary.challenge_metric);
}

fn save_per_class(path: &Path, detailed: &DetailedMetrics) -> Result<(), std::io::Error> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "class\tauroc\tauprc\tf_measure\tf_beta\tg_beta")?;
    for row in detailed.per_class() {
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.class, row.auroc, row.auprc, row.f_measure, row.f_beta, row.g_beta
        )?;
    }
    file.flush()
}

fn print_weights(args: WeightsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let format: WeightFormat = args.format.parse()?;
    let table = WeightTable::load(&args.weights)?;
    let classes = args.classes.map(ClassList::new).transpose()?;

    match table.export(format, classes.as_ref())? {
        WeightExport::Dense(matrix) => {
            for row in matrix.rows() {
                println!("{}", row.iter().join("\t"));
            }
        }
        WeightExport::Labeled(frame) => println!("{frame}"),
    }
    Ok(())
}
