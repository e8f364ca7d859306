use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, error, info};
use resource_bundler::{
    config::{CONFIG_FILE, Config},
    manifest::LoadedManifest,
    orchestrator::{BundleOrchestrator, GenerationOptions},
    resolver::ResourceOracle,
    sink::FsSink,
};

#[derive(Parser, Debug)]
#[command(name = "resource-bundler")]
#[command(version)]
#[command(about = "Generate Rust implementations of declared resource bundles")]
struct Cli {
    /// Manifest declaring the bundles to generate
    #[arg(short, long)]
    manifest: PathBuf,

    /// Configuration file, `resource-bundler.toml` next to the manifest by default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory generated sources are written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Additional locale to generate; may be repeated
    #[arg(short, long = "locale")]
    locales: Vec<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let default = cli
                .manifest
                .parent()
                .map_or_else(|| PathBuf::from(CONFIG_FILE), |dir| dir.join(CONFIG_FILE));
            if default.is_file() {
                Config::load(&default)?
            } else {
                debug!("No {} found, using defaults", default.display());
                Config::default()
            }
        }
    };
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = Some(out_dir.clone());
    }
    for locale in &cli.locales {
        if !config.locales.contains(locale) {
            config.locales.push(locale.clone());
        }
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let manifest = LoadedManifest::load(&cli.manifest)?;
    let out_dir = config
        .out_dir
        .clone()
        .context("No output directory given; pass --out-dir or set out_dir in the config")?;

    let oracle = ResourceOracle::from_config(&config);
    let orchestrator = BundleOrchestrator::new(
        &manifest.hierarchy,
        &manifest.bundles,
        &oracle,
        GenerationOptions::from_config(&config),
    );
    let mut sink = FsSink::new(&out_dir);
    let report = orchestrator.generate_all(&mut sink);

    if !report.is_success() {
        for diagnostic in report.diagnostics() {
            error!("{diagnostic}");
        }
        bail!(
            "{} of {} generation pass(es) failed",
            report.failures.len(),
            report.failures.len() + report.generated.len()
        );
    }

    info!(
        "Generated {} type(s) into {}",
        report.generated.len(),
        out_dir.display()
    );
    Ok(())
}
