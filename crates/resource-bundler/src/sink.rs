//! Destinations for generated sources

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::{
    error::ResourceError,
    naming::to_snake_case,
    types::{FxIndexMap, FxIndexSet},
};

/// A generated type whose name has been claimed but whose source is not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOutput {
    pub module_path: String,
    pub simple_name: String,
}

impl PendingOutput {
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.simple_name.clone()
        } else {
            format!("{}::{}", self.module_path, self.simple_name)
        }
    }
}

pub trait OutputSink {
    /// Claim `module_path::simple_name`, or `None` when it was already
    /// produced during this run
    fn try_create(
        &mut self,
        module_path: &str,
        simple_name: &str,
    ) -> Result<Option<PendingOutput>, ResourceError>;

    /// Persist the source of a claimed type, returning the file written if any
    fn commit(
        &mut self,
        output: PendingOutput,
        source: String,
    ) -> Result<Option<PathBuf>, ResourceError>;
}

/// Writes `<out_dir>/<module dirs>/<snake_case name>.rs`
#[derive(Debug)]
pub struct FsSink {
    out_dir: PathBuf,
    /// Claimed files and the qualified type each one holds
    created: FxIndexMap<PathBuf, String>,
}

impl FsSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            created: FxIndexMap::default(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// File a generated type is written to
    pub fn target_path(&self, output: &PendingOutput) -> PathBuf {
        let mut path = self.out_dir.clone();
        for segment in output.module_path.split("::") {
            if !matches!(segment, "" | "crate" | "self" | "super") {
                path.push(segment);
            }
        }
        path.push(format!("{}.rs", to_snake_case(&output.simple_name)));
        path
    }
}

impl OutputSink for FsSink {
    /// Types whose names differ only in case or underscores share a file
    /// name; the second claim on a file is a clash
    fn try_create(
        &mut self,
        module_path: &str,
        simple_name: &str,
    ) -> Result<Option<PendingOutput>, ResourceError> {
        let output = PendingOutput {
            module_path: module_path.to_owned(),
            simple_name: simple_name.to_owned(),
        };
        let target = self.target_path(&output);
        let qualified_name = output.qualified_name();
        match self.created.get(&target) {
            Some(existing) if *existing == qualified_name => {
                trace!("{qualified_name} was already created");
                Ok(None)
            }
            Some(existing) => Err(ResourceError::OutputClash {
                target: target.display().to_string(),
                existing: existing.clone(),
                requested: qualified_name,
            }),
            None => {
                self.created.insert(target, qualified_name);
                Ok(Some(output))
            }
        }
    }

    fn commit(
        &mut self,
        output: PendingOutput,
        source: String,
    ) -> Result<Option<PathBuf>, ResourceError> {
        let target = self.target_path(&output);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ResourceError::FatalWrite {
                target: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(&target, source).map_err(|source| ResourceError::FatalWrite {
            target: target.display().to_string(),
            source,
        })?;
        debug!("Wrote {} to {}", output.qualified_name(), target.display());
        Ok(Some(target))
    }
}

/// Keeps generated sources in memory, keyed by qualified name
#[derive(Debug, Default)]
pub struct MemorySink {
    claimed: FxIndexSet<String>,
    sources: FxIndexMap<String, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source of a committed type, e.g. `crate::assets::IconsImpl`
    pub fn get(&self, qualified_name: &str) -> Option<&str> {
        self.sources.get(qualified_name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl OutputSink for MemorySink {
    fn try_create(
        &mut self,
        module_path: &str,
        simple_name: &str,
    ) -> Result<Option<PendingOutput>, ResourceError> {
        let output = PendingOutput {
            module_path: module_path.to_owned(),
            simple_name: simple_name.to_owned(),
        };
        Ok(self.claimed.insert(output.qualified_name()).then_some(output))
    }

    fn commit(
        &mut self,
        output: PendingOutput,
        source: String,
    ) -> Result<Option<PathBuf>, ResourceError> {
        self.sources.insert(output.qualified_name(), source);
        Ok(None)
    }
}
