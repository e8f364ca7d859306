//! Error taxonomy and diagnostics accumulated during generation passes

use std::{fmt, io};

use thiserror::Error;

use crate::{model::TypeName, orchestrator::PassState};

/// Coarse classification of a [`ResourceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Resolution,
    Cardinality,
    Dispatch,
    Generation,
    FatalWrite,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolution => "resolution",
            Self::Cardinality => "cardinality",
            Self::Dispatch => "dispatch",
            Self::Generation => "generation",
            Self::FatalWrite => "fatal write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource for {accessor} in {bundle} not found (tried {})", .candidates.join(", "))]
    NotFound {
        bundle: String,
        accessor: String,
        candidates: Vec<String>,
    },

    #[error(
        "No source declared and no resources found with default extensions [{}]",
        .extensions.join(", ")
    )]
    NoDefaultResource { extensions: Vec<String> },

    #[error("Exactly one resource must be specified, found {found}")]
    Cardinality { found: usize },

    #[error("No generator was specified for type {ty} or its supertypes")]
    NoGenerator { ty: TypeName },

    #[error("Unable to read {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: io::Error,
    },

    #[error("{origin} is not valid UTF-8 text")]
    InvalidText { origin: String },

    #[error("Unrecognized image format in {origin}")]
    UnrecognizedImage { origin: String },

    #[error(
        "{origin} is {size} bytes, which exceeds the {limit} byte inline limit, and no \
         deployment directory is configured"
    )]
    InlineLimit {
        origin: String,
        size: usize,
        limit: usize,
    },

    #[error("{0}")]
    Generation(String),

    #[error("Unable to write {target}: {source}")]
    FatalWrite {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("{requested} would overwrite {existing} in {target}")]
    OutputClash {
        target: String,
        existing: String,
        requested: String,
    },
}

impl ResourceError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::NoDefaultResource { .. } => ErrorCategory::Resolution,
            Self::Cardinality { .. } => ErrorCategory::Cardinality,
            Self::NoGenerator { .. } => ErrorCategory::Dispatch,
            Self::Read { .. }
            | Self::InvalidText { .. }
            | Self::UnrecognizedImage { .. }
            | Self::InlineLimit { .. }
            | Self::Generation(_) => ErrorCategory::Generation,
            Self::FatalWrite { .. } | Self::OutputClash { .. } => ErrorCategory::FatalWrite,
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }
}

/// One error tied to the bundle, accessor and phase that produced it
#[derive(Debug)]
pub struct Diagnostic {
    pub bundle: String,
    /// `None` for errors raised by a generator as a whole
    pub accessor: Option<String>,
    pub phase: PassState,
    pub error: ResourceError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.accessor {
            Some(accessor) => write!(
                f,
                "{}::{} ({} error while {}): {}",
                self.bundle,
                accessor,
                self.error.category(),
                self.phase,
                self.error
            ),
            None => write!(
                f,
                "{} ({} error while {}): {}",
                self.bundle,
                self.error.category(),
                self.phase,
                self.error
            ),
        }
    }
}

/// Collector threaded through the phases of one pass
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        bundle: &TypeName,
        accessor: Option<&str>,
        phase: PassState,
        error: ResourceError,
    ) {
        self.entries.push(Diagnostic {
            bundle: bundle.to_string(),
            accessor: accessor.map(str::to_owned),
            phase,
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A generation pass that ended in the `Failed` state
#[derive(Debug, Error)]
#[error(
    "Generation of {bundle}{} failed with {count} error(s)",
    .locale.as_ref().map(|locale| format!(" for locale {locale}")).unwrap_or_default(),
    count = .diagnostics.len()
)]
pub struct GenerationFailed {
    pub bundle: TypeName,
    pub locale: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}
