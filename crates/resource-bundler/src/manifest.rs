//! TOML manifest declaring bundles and custom result types
//!
//! ```toml
//! [[types]]
//! name = "crate::Stylesheet"
//! extends = ["TextResource"]
//! default_extensions = [".css"]
//!
//! [[bundles]]
//! name = "crate::assets::Icons"
//! package = "com.example.icons"
//!
//! [[bundles.accessors]]
//! name = "logo"
//! kind = "ImageResource"
//! source = ["logo@2x.png"]
//! width = 32
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;

use crate::{
    model::{DeclaredAccessor, DeclaredBundle, StaticTypeHierarchy, TypeName, builtin},
    naming::is_valid_identifier,
    types::{FxIndexMap, FxIndexSet},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    types: Vec<TypeSpec>,
    #[serde(default)]
    bundles: Vec<BundleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSpec {
    name: String,
    #[serde(default)]
    extends: Vec<String>,
    default_extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleSpec {
    name: String,
    #[serde(default)]
    package: String,
    #[serde(default)]
    enclosing: Vec<String>,
    #[serde(default)]
    extends: Vec<String>,
    #[serde(default)]
    accessors: Vec<AccessorSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccessorSpec {
    name: String,
    kind: String,
    source: Option<Vec<String>>,
    mime_type: Option<String>,
    #[serde(default = "default_embed")]
    embed: bool,
    width: Option<u32>,
    height: Option<u32>,
    locale: Option<String>,
}

const fn default_embed() -> bool {
    true
}

impl AccessorSpec {
    fn into_accessor(self) -> DeclaredAccessor {
        DeclaredAccessor {
            source: self.source,
            mime_type: self.mime_type,
            embed: self.embed,
            width: self.width,
            height: self.height,
            locale: self.locale,
            ..DeclaredAccessor::new(self.name, TypeName::new(self.kind))
        }
    }
}

impl BundleSpec {
    /// Convert to a bundle, recording invalid names and duplicate accessors
    fn into_bundle(self, problems: &mut FxIndexSet<String>) -> DeclaredBundle {
        let name = TypeName::new(self.name);
        if !is_valid_identifier(name.simple_name()) {
            problems.insert(format!("Bundle name {name} is not a valid type name"));
        }
        for enclosing in &self.enclosing {
            if !is_valid_identifier(enclosing) {
                problems.insert(format!(
                    "Enclosing type {enclosing:?} of {name} is not a valid type name"
                ));
            }
        }

        let mut seen = FxIndexSet::default();
        let mut accessors = Vec::with_capacity(self.accessors.len());
        for accessor in self.accessors {
            if !is_valid_identifier(&accessor.name) {
                problems.insert(format!(
                    "Accessor {:?} of {name} is not a valid identifier",
                    accessor.name
                ));
            }
            if !seen.insert(accessor.name.clone()) {
                problems.insert(format!(
                    "Accessor {} is declared more than once in {name}",
                    accessor.name
                ));
                continue;
            }
            accessors.push(accessor.into_accessor());
        }

        DeclaredBundle {
            name,
            package: self.package,
            enclosing: self.enclosing,
            supertypes: self.extends.into_iter().map(TypeName::new).collect(),
            accessors,
        }
    }
}

/// Declared bundles and the type hierarchy they live in
#[derive(Debug)]
pub struct LoadedManifest {
    pub hierarchy: StaticTypeHierarchy,
    /// Bundles in manifest order, inherited accessors flattened in
    pub bundles: FxIndexMap<TypeName, DeclaredBundle>,
}

impl LoadedManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        debug!(
            "Loaded {} bundle(s) from {}",
            manifest.bundles.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse and validate a manifest, reporting every problem at once
    pub fn parse(content: &str) -> Result<Self> {
        let file: ManifestFile = toml::from_str(content).context("Malformed manifest")?;
        let mut problems = FxIndexSet::default();

        let mut hierarchy = StaticTypeHierarchy::new();
        for spec in file.types {
            if spec.name.trim().is_empty() {
                problems.insert("A declared type has an empty name".to_owned());
                continue;
            }
            hierarchy.declare(
                TypeName::new(spec.name),
                spec.extends.into_iter().map(TypeName::new).collect(),
                spec.default_extensions,
            );
        }

        let mut bundles: FxIndexMap<TypeName, DeclaredBundle> = FxIndexMap::default();
        for spec in file.bundles {
            let bundle = spec.into_bundle(&mut problems);
            if bundles.contains_key(&bundle.name) {
                problems.insert(format!("Bundle {} is declared more than once", bundle.name));
                continue;
            }
            bundles.insert(bundle.name.clone(), bundle);
        }

        let client_bundle = TypeName::new(builtin::CLIENT_BUNDLE);
        for bundle in bundles.values() {
            for supertype in &bundle.supertypes {
                if !bundles.contains_key(supertype) && !hierarchy.contains(supertype) {
                    problems.insert(format!(
                        "Bundle {} extends unknown type {supertype}",
                        bundle.name
                    ));
                }
            }
        }

        let flattened: Vec<(TypeName, Vec<DeclaredAccessor>)> = bundles
            .keys()
            .map(|name| {
                let mut stack = Vec::new();
                let accessors = collect_accessors(name, &bundles, &mut stack, &mut problems);
                (name.clone(), accessors)
            })
            .collect();

        if !problems.is_empty() {
            bail!(
                "{} problem(s) found:\n  {}",
                problems.len(),
                problems.into_iter().collect::<Vec<_>>().join("\n  ")
            );
        }

        for (name, accessors) in flattened {
            if let Some(bundle) = bundles.get_mut(&name) {
                bundle.accessors = accessors;
                let mut supertypes = bundle.supertypes.clone();
                if !supertypes.contains(&client_bundle) {
                    supertypes.push(client_bundle.clone());
                }
                hierarchy.declare(name, supertypes, None);
            }
        }

        Ok(Self { hierarchy, bundles })
    }
}

/// Accessors of `name` with inherited ones first.
///
/// An inherited accessor keeps the trait that declares it as owner. A local
/// accessor of the same name replaces its resource settings in place but the
/// method stays with the declaring trait.
fn collect_accessors(
    name: &TypeName,
    bundles: &FxIndexMap<TypeName, DeclaredBundle>,
    stack: &mut Vec<TypeName>,
    problems: &mut FxIndexSet<String>,
) -> Vec<DeclaredAccessor> {
    if stack.contains(name) {
        problems.insert(format!("Bundle {name} inherits from itself"));
        return Vec::new();
    }
    let Some(bundle) = bundles.get(name) else {
        return Vec::new();
    };

    stack.push(name.clone());
    let mut accessors: Vec<DeclaredAccessor> = Vec::new();
    for parent in &bundle.supertypes {
        for mut inherited in collect_accessors(parent, bundles, stack, problems) {
            if accessors.iter().any(|accessor| accessor.name == inherited.name) {
                continue;
            }
            inherited.owner.get_or_insert_with(|| parent.clone());
            accessors.push(inherited);
        }
    }
    for own in &bundle.accessors {
        match accessors.iter_mut().find(|accessor| accessor.name == own.name) {
            Some(slot) => {
                let owner = slot.owner.take();
                *slot = DeclaredAccessor {
                    owner,
                    ..own.clone()
                };
            }
            None => accessors.push(own.clone()),
        }
    }
    stack.pop();
    accessors
}
