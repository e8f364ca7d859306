//! Generates the fixture bundles declared in `bundles.toml` into `OUT_DIR`

#![allow(clippy::print_stdout)]

use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};
use resource_bundler::{
    manifest::LoadedManifest,
    orchestrator::{BundleOrchestrator, GenerationOptions},
    resolver::{Location, ResourceOracle},
    sink::FsSink,
};

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR")?);

    let manifest = LoadedManifest::load(&manifest_dir.join("bundles.toml"))?;
    let mut oracle = ResourceOracle::new();
    oracle.add_location(Location::Source, manifest_dir.join("res"));
    let options = GenerationOptions {
        locales: vec!["fr".to_owned()],
        ..GenerationOptions::default()
    };

    let orchestrator =
        BundleOrchestrator::new(&manifest.hierarchy, &manifest.bundles, &oracle, options);
    let mut sink = FsSink::new(out_dir);
    let report = orchestrator.generate_all(&mut sink);
    if !report.is_success() {
        let diagnostics: Vec<String> = report.diagnostics().map(ToString::to_string).collect();
        bail!("Fixture generation failed:\n{}", diagnostics.join("\n"));
    }

    println!("cargo:rerun-if-changed=bundles.toml");
    println!("cargo:rerun-if-changed=res");
    Ok(())
}
