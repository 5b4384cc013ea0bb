//! Command-line front end: generate a synthetic dataset, detect laundering
//! groups in one, or both in a single run.

use std::path::{Path, PathBuf};

use aml_dataset::{DataGenerator, GeneratedDataset, GenerationSummary, GeneratorConfig};
use aml_pipeline::{Detector, GraphSession, RunReport, append_section};
use aml_primitives::{DetectionConfig, TimeDifferenceMode};
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

#[derive(Parser)]
#[command(name = "aml")]
#[command(version, about = "Layering ring detection over transaction graphs", long_about = None)]
struct Cli {
    /// Directory holding nodes.txt and transactions.txt
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Summary file that report sections are appended to
    #[arg(long, default_value = aml_pipeline::SUMMARY_FILE, global = true)]
    summary: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic dataset with planted laundering patterns
    Generate(GenerateArgs),

    /// Detect laundering groups in an existing dataset
    Detect(DetectArgs),

    /// Generate a dataset, then detect over it and rate the result
    Run {
        #[command(flatten)]
        generate: GenerateArgs,

        #[command(flatten)]
        detect: DetectArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TimeMode {
    Signed,
    Absolute,
}

impl From<TimeMode> for TimeDifferenceMode {
    fn from(mode: TimeMode) -> Self {
        match mode {
            TimeMode::Signed => TimeDifferenceMode::Signed,
            TimeMode::Absolute => TimeDifferenceMode::Absolute,
        }
    }
}

#[derive(Args)]
struct DetectArgs {
    /// JSON file with detection parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum balance score of a candidate account
    #[arg(long)]
    degree_constant: Option<f64>,

    /// Minimum similarity of a dense pair
    #[arg(long)]
    dense_pair_constant: Option<f64>,

    /// Minimum amount of a lead transaction
    #[arg(long)]
    amount_threshold: Option<f64>,

    /// Maximum amount gap between lead and follow
    #[arg(long)]
    allowed_amount_difference: Option<f64>,

    /// Maximum time gap between lead and follow
    #[arg(long)]
    allowed_time_difference: Option<f64>,

    #[arg(long, value_enum)]
    time_mode: Option<TimeMode>,

    /// Build only the lead hop of each matched pair
    #[arg(long)]
    demo: bool,

    /// Persist the final graph into a sled store at this path (wiped first)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl DetectArgs {
    fn detection_config(&self) -> anyhow::Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => DetectionConfig::default(),
        };
        if let Some(v) = self.degree_constant {
            config.degree_constant = v;
        }
        if let Some(v) = self.dense_pair_constant {
            config.dense_pair_constant = v;
        }
        if let Some(v) = self.amount_threshold {
            config.amount_threshold = v;
        }
        if let Some(v) = self.allowed_amount_difference {
            config.allowed_amount_difference = v;
        }
        if let Some(v) = self.allowed_time_difference {
            config.allowed_time_difference = v;
        }
        if let Some(mode) = self.time_mode {
            config.time_difference_mode = mode.into();
        }
        config.demo |= self.demo;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON file with generator parameters
    #[arg(long)]
    generator_config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of accounts
    #[arg(long)]
    nodes: Option<u64>,

    /// Number of clean sender/receiver pairings
    #[arg(long)]
    clean: Option<u32>,

    /// Number of planted laundering patterns
    #[arg(long)]
    patterns: Option<u32>,
}

impl GenerateArgs {
    fn generator_config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.generator_config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => GeneratorConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(n) = self.nodes {
            config.node_count = n;
        }
        if let Some(n) = self.clean {
            config.clean_transaction_count = n;
        }
        if let Some(n) = self.patterns {
            config.ml_pattern_count = n;
        }
        Ok(config)
    }
}

fn generate(args: &GenerateArgs, dir: &Path, summary: &Path) -> anyhow::Result<GeneratedDataset> {
    let data = DataGenerator::new(args.generator_config()?)?.generate()?;
    data.write_to(dir)?;
    let rendered = data.summary.render();
    append_section(summary, &rendered).with_context(|| format!("writing {}", summary.display()))?;
    println!("{}", rendered);
    Ok(data)
}

fn detect(
    args: &DetectArgs,
    dir: &Path,
    summary: &Path,
    generated: Option<&GenerationSummary>,
) -> anyhow::Result<()> {
    let config = args.detection_config()?;
    let mut session = match &args.store {
        Some(path) => GraphSession::with_store(path)?,
        None => GraphSession::in_memory(),
    };
    let outcome = Detector::new(&config).run_from_dir(&mut session, dir)?;
    session.close()?;

    let mut report = RunReport::new(&config, &outcome);
    if let Some(generated) = generated {
        report = report.with_generation(generated);
    }
    report
        .append_to(summary)
        .with_context(|| format!("writing {}", summary.display()))?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("AML framework starting in {}", cli.dir.display());

    match &cli.command {
        Commands::Generate(args) => {
            generate(args, &cli.dir, &cli.summary)?;
        }
        Commands::Detect(args) => detect(args, &cli.dir, &cli.summary, None)?,
        Commands::Run { generate: g, detect: d } => {
            let data = generate(g, &cli.dir, &cli.summary)?;
            detect(d, &cli.dir, &cli.summary, Some(&data.summary))?;
        }
    }
    Ok(())
}
