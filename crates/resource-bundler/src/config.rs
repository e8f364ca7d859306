//! Generation settings loaded from a TOML file
//!
//! Every field is optional. Relative directories are resolved against the
//! directory containing the configuration file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::{context::DeployStrategy, resolver::Location};

/// Default configuration file name looked up next to the manifest
pub const CONFIG_FILE: &str = "resource-bundler.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source_dirs: Vec<PathBuf>,
    pub generated_dirs: Vec<PathBuf>,
    pub classpath_dirs: Vec<PathBuf>,
    pub output_dirs: Vec<PathBuf>,
    pub processor_dirs: Vec<PathBuf>,
    /// Extra locale permutations, each generated in addition to the base pass
    pub locales: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub deploy: Option<DeployConfig>,
    pub strip_comments: bool,
}

/// Target of externally deployed resources
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub url_prefix: String,
}

impl Config {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Make every relative directory absolute with respect to `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for dirs in [
            &mut self.source_dirs,
            &mut self.generated_dirs,
            &mut self.classpath_dirs,
            &mut self.output_dirs,
            &mut self.processor_dirs,
        ] {
            dirs.iter_mut().for_each(resolve);
        }
        if let Some(out_dir) = &mut self.out_dir {
            resolve(out_dir);
        }
        if let Some(deploy) = &mut self.deploy {
            resolve(&mut deploy.dir);
        }
    }

    /// Search directories per location, in lookup priority order
    pub fn search_locations(&self) -> [(Location, &[PathBuf]); 5] {
        [
            (Location::Source, self.source_dirs.as_slice()),
            (Location::GeneratedSource, self.generated_dirs.as_slice()),
            (Location::ClassPath, self.classpath_dirs.as_slice()),
            (Location::ClassOutput, self.output_dirs.as_slice()),
            (Location::ProcessorPath, self.processor_dirs.as_slice()),
        ]
    }

    pub fn deploy_strategy(&self) -> DeployStrategy {
        match &self.deploy {
            Some(deploy) => DeployStrategy::External {
                dir: deploy.dir.clone(),
                url_prefix: deploy.url_prefix.clone(),
            },
            None => DeployStrategy::Inline,
        }
    }
}
