use std::{
    cell::RefCell,
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};

use crate::{
    config::Config,
    error::ResourceError,
    model::{DeclaredAccessor, DeclaredBundle},
    types::{FxIndexMap, FxIndexSet},
};

/// Backing locations searched for resources, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Source,
    GeneratedSource,
    ClassPath,
    ClassOutput,
    ProcessorPath,
}

impl Location {
    pub const ALL: [Self; 5] = [
        Self::Source,
        Self::GeneratedSource,
        Self::ClassPath,
        Self::ClassOutput,
        Self::ProcessorPath,
    ];
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::GeneratedSource => "generated-source",
            Self::ClassPath => "classpath",
            Self::ClassOutput => "class-output",
            Self::ProcessorPath => "processor-path",
        };
        f.write_str(name)
    }
}

/// A located but not yet loaded resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    Embedded { path: String },
    File { location: Location, path: PathBuf },
}

impl ResourceHandle {
    /// Human readable origin used in diagnostics and generated comments
    pub fn origin(&self) -> String {
        match self {
            Self::Embedded { path } => format!("embedded:{path}"),
            Self::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            Self::Embedded { path } => path.rsplit('/').next().unwrap_or(path).to_owned(),
            Self::File { path, .. } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Bytes of a resource together with where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub origin: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Locates resources across the embedded overlay and the backing locations
#[derive(Debug, Default)]
pub struct ResourceOracle {
    /// Search directories grouped by location, each group deduplicated
    locations: FxIndexMap<Location, FxIndexSet<PathBuf>>,
    /// In-process resources consulted before any directory
    embedded: FxIndexMap<String, Vec<u8>>,
    /// Memoized lookups of full resource paths, including misses
    lookup_cache: RefCell<FxIndexMap<String, Option<ResourceHandle>>>,
}

impl ResourceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        let mut oracle = Self::new();
        for (location, dirs) in config.search_locations() {
            for dir in dirs {
                oracle.add_location(location, dir.clone());
            }
        }
        oracle
    }

    /// Add a search directory for `location`
    pub fn add_location(&mut self, location: Location, dir: PathBuf) {
        let dir = match dir.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!("Failed to canonicalize {} directory {}: {}", location, dir.display(), e);
                dir
            }
        };
        debug!("Adding {location} directory {}", dir.display());
        self.locations.entry(location).or_default().insert(dir);
        self.lookup_cache.borrow_mut().clear();
    }

    /// Add an in-memory resource under a root-relative path
    #[must_use]
    pub fn with_embedded(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let path = path.into().trim_start_matches('/').to_owned();
        self.embedded.insert(path, bytes.into());
        self.lookup_cache.borrow_mut().clear();
        self
    }

    /// All search directories in lookup order
    pub fn search_directories(&self) -> Vec<(Location, PathBuf)> {
        Location::ALL
            .iter()
            .filter_map(|location| self.locations.get(location).map(|dirs| (*location, dirs)))
            .flat_map(|(location, dirs)| dirs.iter().map(move |dir| (location, dir.clone())))
            .collect()
    }

    /// Find `name` inside `package`, preferring the most specific locale.
    ///
    /// For `fr_CA_ontario` and `img.png` the candidates are
    /// `img_fr_CA_ontario.png`, `img_fr_CA.png`, `img_fr.png`, then `img.png`.
    pub fn find_resource(
        &self,
        package: &str,
        name: &str,
        locale: Option<&str>,
    ) -> Option<ResourceHandle> {
        let full_name = join_path(package, name);
        locale_candidates(&full_name, locale)
            .into_iter()
            .find_map(|candidate| self.lookup(&candidate))
    }

    /// Locate the resources backing `accessor`.
    ///
    /// Declared sources are tried in order, each relative to the bundle's
    /// package first and then root-relative; the first hit wins. Without
    /// declared sources the accessor name plus each default extension is tried.
    /// A declared but empty source list yields an empty result.
    pub fn find_resources(
        &self,
        bundle: &DeclaredBundle,
        accessor: &DeclaredAccessor,
        default_extensions: &[String],
        locale: Option<&str>,
    ) -> Result<Vec<ResourceHandle>, ResourceError> {
        let package = bundle.package_path();

        if let Some(sources) = &accessor.source {
            for source in sources {
                let found = self
                    .find_resource(&package, source, locale)
                    .or_else(|| self.find_resource("", source, locale));
                if let Some(handle) = found {
                    debug!("Resolved {}::{} to {}", bundle.name, accessor.name, handle.origin());
                    return Ok(vec![handle]);
                }
            }
            if sources.is_empty() {
                return Ok(Vec::new());
            }
            return Err(ResourceError::NotFound {
                bundle: bundle.name.to_string(),
                accessor: accessor.name.clone(),
                candidates: sources.clone(),
            });
        }

        for extension in default_extensions {
            let name = format!("{}{}", accessor.name, extension);
            if let Some(handle) = self.find_resource(&package, &name, locale) {
                debug!("Resolved {}::{} to {}", bundle.name, accessor.name, handle.origin());
                return Ok(vec![handle]);
            }
        }

        Err(ResourceError::NoDefaultResource {
            extensions: default_extensions.to_vec(),
        })
    }

    /// Read the bytes behind `handle`
    pub fn load(&self, handle: &ResourceHandle) -> Result<ResolvedResource, ResourceError> {
        let bytes = match handle {
            ResourceHandle::Embedded { path } => self
                .embedded
                .get(path)
                .cloned()
                .ok_or_else(|| ResourceError::generation(format!("embedded resource {path} vanished")))?,
            ResourceHandle::File { path, .. } => {
                fs::read(path).map_err(|source| ResourceError::Read {
                    origin: handle.origin(),
                    source,
                })?
            }
        };
        Ok(ResolvedResource {
            origin: handle.origin(),
            file_name: handle.file_name(),
            bytes,
        })
    }

    /// Look up one full resource path, embedded overlay first
    fn lookup(&self, path: &str) -> Option<ResourceHandle> {
        if let Some(cached) = self.lookup_cache.borrow().get(path) {
            return cached.clone();
        }

        let found = self.lookup_uncached(path);
        self.lookup_cache
            .borrow_mut()
            .insert(path.to_owned(), found.clone());
        found
    }

    fn lookup_uncached(&self, path: &str) -> Option<ResourceHandle> {
        trace!("Looking up resource {path}");
        if self.embedded.contains_key(path) {
            return Some(ResourceHandle::Embedded {
                path: path.to_owned(),
            });
        }

        for (location, dir) in self.search_directories() {
            let candidate = dir.join(Path::new(path));
            trace!("  trying {}", candidate.display());
            if candidate.is_file() {
                return Some(ResourceHandle::File {
                    location,
                    path: candidate,
                });
            }
        }
        None
    }
}

fn join_path(package: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if package.is_empty() {
        name.to_owned()
    } else {
        format!("{package}/{name}")
    }
}

/// Locale-qualified variants of `path`, most specific first, ending with `path`
pub fn locale_candidates(path: &str, locale: Option<&str>) -> Vec<String> {
    let Some(locale) = locale.filter(|locale| !locale.is_empty()) else {
        return vec![path.to_owned()];
    };

    let file_start = path.rfind('/').map_or(0, |index| index + 1);
    let (prefix, extension) = match path[file_start..].rfind('.') {
        Some(dot) => path.split_at(file_start + dot),
        None => (path, ""),
    };

    let segments: Vec<&str> = locale.split('_').collect();
    (0..=segments.len())
        .rev()
        .map(|count| {
            let mut candidate = prefix.to_owned();
            for segment in &segments[..count] {
                candidate.push('_');
                candidate.push_str(segment);
            }
            candidate.push_str(extension);
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn create_test_file(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    #[test]
    fn test_locale_candidates_most_specific_first() {
        assert_eq!(
            locale_candidates("pkg/img.png", Some("fr_CA_ontario")),
            vec![
                "pkg/img_fr_CA_ontario.png",
                "pkg/img_fr_CA.png",
                "pkg/img_fr.png",
                "pkg/img.png",
            ]
        );
        assert_eq!(locale_candidates("a.b/readme", Some("de")), vec!["a.b/readme_de", "a.b/readme"]);
        assert_eq!(locale_candidates("x.txt", None), vec!["x.txt"]);
    }

    #[test]
    fn test_locale_fallback_to_unqualified_name() -> Result<()> {
        let temp_dir = TempDir::new()?;
        create_test_file(&temp_dir.path().join("pkg/hello.txt"), b"base")?;

        let mut oracle = ResourceOracle::new();
        oracle.add_location(Location::Source, temp_dir.path().to_path_buf());

        let handle = oracle
            .find_resource("pkg", "hello.txt", Some("l1_l2_l3"))
            .expect("unqualified resource should be found");
        assert_eq!(oracle.load(&handle)?.bytes, b"base");
        Ok(())
    }

    #[test]
    fn test_most_specific_locale_wins() -> Result<()> {
        let temp_dir = TempDir::new()?;
        create_test_file(&temp_dir.path().join("hello.txt"), b"base")?;
        create_test_file(&temp_dir.path().join("hello_fr.txt"), b"fr")?;
        create_test_file(&temp_dir.path().join("hello_fr_CA.txt"), b"fr_CA")?;

        let mut oracle = ResourceOracle::new();
        oracle.add_location(Location::Source, temp_dir.path().to_path_buf());

        let load = |locale| -> Result<Vec<u8>> {
            let handle = oracle
                .find_resource("", "hello.txt", locale)
                .expect("resource should be found");
            Ok(oracle.load(&handle)?.bytes)
        };
        assert_eq!(load(Some("fr_CA"))?, b"fr_CA");
        assert_eq!(load(Some("fr_BE"))?, b"fr");
        assert_eq!(load(None)?, b"base");
        Ok(())
    }

    #[test]
    fn test_location_priority_is_fixed() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let classpath = temp_dir.path().join("classpath");
        let source = temp_dir.path().join("source");
        create_test_file(&classpath.join("res.txt"), b"classpath")?;
        create_test_file(&source.join("res.txt"), b"source")?;

        let mut oracle = ResourceOracle::new();
        // Registration order must not matter
        oracle.add_location(Location::ClassPath, classpath);
        oracle.add_location(Location::Source, source);

        let handle = oracle.find_resource("", "res.txt", None).expect("found");
        assert!(matches!(
            handle,
            ResourceHandle::File {
                location: Location::Source,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_embedded_overlay_is_consulted_first() -> Result<()> {
        let temp_dir = TempDir::new()?;
        create_test_file(&temp_dir.path().join("res.txt"), b"disk")?;

        let mut oracle = ResourceOracle::new().with_embedded("res.txt", b"memory".to_vec());
        oracle.add_location(Location::Source, temp_dir.path().to_path_buf());

        let handle = oracle.find_resource("", "res.txt", None).expect("found");
        assert_eq!(handle.origin(), "embedded:res.txt");
        assert_eq!(oracle.load(&handle)?.bytes, b"memory");
        Ok(())
    }

    #[test]
    fn test_first_declared_source_wins() -> Result<()> {
        let oracle = ResourceOracle::new()
            .with_embedded("pkg/a.png", b"a".to_vec())
            .with_embedded("pkg/b.png", b"b".to_vec());
        let bundle = DeclaredBundle::new("crate::Icons", "pkg");
        let accessor = DeclaredAccessor::new("icon", "ImageResource").with_source(["a.png", "b.png"]);

        let handles = oracle.find_resources(&bundle, &accessor, &[], None)?;
        assert_eq!(handles.len(), 1);
        assert_eq!(oracle.load(&handles[0])?.bytes, b"a");
        Ok(())
    }

    #[test]
    fn test_declared_source_falls_back_to_root_relative() -> Result<()> {
        let oracle = ResourceOracle::new().with_embedded("shared/logo.png", b"logo".to_vec());
        let bundle = DeclaredBundle::new("crate::Icons", "com.example");
        let accessor = DeclaredAccessor::new("logo", "ImageResource").with_source(["shared/logo.png"]);

        let handles = oracle.find_resources(&bundle, &accessor, &[], None)?;
        assert_eq!(handles[0].origin(), "embedded:shared/logo.png");
        Ok(())
    }

    #[test]
    fn test_missing_sources_report_accessor_and_bundle() {
        let oracle = ResourceOracle::new();
        let bundle = DeclaredBundle::new("crate::Icons", "pkg");
        let accessor = DeclaredAccessor::new("icon", "ImageResource").with_source(["missing.png"]);

        let error = oracle
            .find_resources(&bundle, &accessor, &[], None)
            .expect_err("nothing to find");
        assert_eq!(
            error.to_string(),
            "Resource for icon in crate::Icons not found (tried missing.png)"
        );
    }

    #[test]
    fn test_default_extensions_in_declared_order() -> Result<()> {
        let oracle = ResourceOracle::new()
            .with_embedded("pkg/icon.gif", b"gif".to_vec())
            .with_embedded("pkg/icon.bmp", b"bmp".to_vec());
        let bundle = DeclaredBundle::new("crate::Icons", "pkg");
        let accessor = DeclaredAccessor::new("icon", "ImageResource");
        let extensions = [".png", ".jpg", ".gif", ".bmp"].map(str::to_owned);

        let handles = oracle.find_resources(&bundle, &accessor, &extensions, None)?;
        assert_eq!(handles[0].origin(), "embedded:pkg/icon.gif");

        let missing = DeclaredAccessor::new("other", "ImageResource");
        assert!(matches!(
            oracle.find_resources(&bundle, &missing, &extensions, None),
            Err(ResourceError::NoDefaultResource { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_declared_empty_sources_yield_nothing() -> Result<()> {
        let oracle = ResourceOracle::new();
        let bundle = DeclaredBundle::new("crate::Icons", "pkg");
        let accessor = DeclaredAccessor::new("icon", "ImageResource").with_source(Vec::<String>::new());

        assert!(oracle.find_resources(&bundle, &accessor, &[], None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_negative_lookups_are_cached() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut oracle = ResourceOracle::new();
        oracle.add_location(Location::Source, temp_dir.path().to_path_buf());

        assert!(oracle.find_resource("", "late.txt", None).is_none());
        create_test_file(&temp_dir.path().join("late.txt"), b"late")?;
        assert!(
            oracle.find_resource("", "late.txt", None).is_none(),
            "misses are memoized for the lifetime of the oracle"
        );
        Ok(())
    }
}
