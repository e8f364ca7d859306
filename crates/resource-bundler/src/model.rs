//! Abstract view of declared bundles, accessors and their type hierarchy
//!
//! The engine never parses source code. Declared bundles and the supertype
//! graph of result types come from a [`TypeHierarchy`] implementation, which
//! for the command line driver is built from a manifest.

use std::fmt;

use log::trace;

use crate::types::{FxIndexMap, FxIndexSet};

/// Built-in type paths provided by the `bundle-runtime` crate
pub mod builtin {
    pub const RESOURCE_PROTOTYPE: &str = "::bundle_runtime::ResourcePrototype";
    pub const TEXT_RESOURCE: &str = "::bundle_runtime::TextResource";
    pub const DATA_RESOURCE: &str = "::bundle_runtime::DataResource";
    pub const IMAGE_RESOURCE: &str = "::bundle_runtime::ImageResource";
    pub const CLIENT_BUNDLE: &str = "::bundle_runtime::ClientBundle";

    /// The universal root every type implicitly derives from
    pub const ROOT: &str = "::core::any::Any";

    /// Short aliases accepted wherever a type path is expected
    pub const ALIASES: [(&str, &str); 5] = [
        ("ResourcePrototype", RESOURCE_PROTOTYPE),
        ("TextResource", TEXT_RESOURCE),
        ("DataResource", DATA_RESOURCE),
        ("ImageResource", IMAGE_RESOURCE),
        ("ClientBundle", CLIENT_BUNDLE),
    ];
}

/// Fully qualified Rust path of a declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name, expanding the built-in short aliases
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = path.trim();
        for (alias, full) in builtin::ALIASES {
            if path == alias {
                return Self(full.to_owned());
            }
        }
        Self(path.to_owned())
    }

    pub fn root() -> Self {
        Self(builtin::ROOT.to_owned())
    }

    pub fn is_root(&self) -> bool {
        self.0 == builtin::ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, e.g. `Icons` for `crate::assets::Icons`
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, e.g. `crate::assets`
    pub fn module_path(&self) -> &str {
        match self.0.rfind("::") {
            Some(index) => &self.0[..index],
            None => "",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Source of supertype information for declared result types
pub trait TypeHierarchy: fmt::Debug {
    /// Direct declared supertypes of `ty`, or `None` when the type is unknown
    fn supertypes(&self, ty: &TypeName) -> Option<&[TypeName]>;

    /// Default extensions declared on `ty` itself, if any
    fn default_extensions(&self, ty: &TypeName) -> Option<&[String]>;
}

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    supertypes: Vec<TypeName>,
    default_extensions: Option<Vec<String>>,
}

/// In-memory type hierarchy seeded with the runtime's built-in kinds
#[derive(Debug, Clone)]
pub struct StaticTypeHierarchy {
    types: FxIndexMap<TypeName, TypeEntry>,
}

impl Default for StaticTypeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticTypeHierarchy {
    pub fn new() -> Self {
        let mut hierarchy = Self {
            types: FxIndexMap::default(),
        };
        let prototype = TypeName::new(builtin::RESOURCE_PROTOTYPE);
        hierarchy.declare(prototype.clone(), Vec::new(), None);
        hierarchy.declare(TypeName::new(builtin::CLIENT_BUNDLE), Vec::new(), None);
        hierarchy.declare(
            TypeName::new(builtin::TEXT_RESOURCE),
            vec![prototype.clone()],
            Some(vec![".txt".to_owned()]),
        );
        hierarchy.declare(
            TypeName::new(builtin::DATA_RESOURCE),
            vec![prototype.clone()],
            None,
        );
        hierarchy.declare(
            TypeName::new(builtin::IMAGE_RESOURCE),
            vec![prototype],
            Some(
                [".png", ".jpg", ".gif", ".bmp"]
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            ),
        );
        hierarchy
    }

    /// Declare or replace a type and its direct supertypes
    pub fn declare(
        &mut self,
        ty: TypeName,
        supertypes: Vec<TypeName>,
        default_extensions: Option<Vec<String>>,
    ) {
        self.types.insert(
            ty,
            TypeEntry {
                supertypes,
                default_extensions,
            },
        );
    }

    pub fn contains(&self, ty: &TypeName) -> bool {
        self.types.contains_key(ty)
    }
}

impl TypeHierarchy for StaticTypeHierarchy {
    fn supertypes(&self, ty: &TypeName) -> Option<&[TypeName]> {
        self.types.get(ty).map(|entry| entry.supertypes.as_slice())
    }

    fn default_extensions(&self, ty: &TypeName) -> Option<&[String]> {
        self.types
            .get(ty)
            .and_then(|entry| entry.default_extensions.as_deref())
    }
}

/// Transitive supertypes of `ty`, excluding `ty` itself.
///
/// Depth-first pre-order over declared supertypes in declaration order with
/// duplicates dropped, so the result is deterministic even for diamonds.
/// Returns `None` when `ty` is unknown to the hierarchy.
pub fn all_parents(hierarchy: &dyn TypeHierarchy, ty: &TypeName) -> Option<FxIndexSet<TypeName>> {
    let direct = hierarchy.supertypes(ty)?;
    let mut seen = FxIndexSet::default();
    let mut stack: Vec<&TypeName> = direct.iter().rev().collect();
    while let Some(current) = stack.pop() {
        if current == ty || !seen.insert(current.clone()) {
            continue;
        }
        if let Some(parents) = hierarchy.supertypes(current) {
            stack.extend(parents.iter().rev());
        }
    }
    trace!("Supertypes of {ty}: {seen:?}");
    Some(seen)
}

/// Default extensions for `ty`, looked up on the type itself and then on its
/// supertypes in discovery order. Empty when none are declared.
pub fn find_default_extensions(hierarchy: &dyn TypeHierarchy, ty: &TypeName) -> Vec<String> {
    if let Some(extensions) = hierarchy.default_extensions(ty) {
        return extensions.to_vec();
    }
    all_parents(hierarchy, ty)
        .into_iter()
        .flatten()
        .find_map(|parent| hierarchy.default_extensions(&parent).map(<[String]>::to_vec))
        .unwrap_or_default()
}

/// One named resource accessor of a declared bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredAccessor {
    pub name: String,
    pub result_type: TypeName,
    /// `None` when no sources were declared, `Some(vec![])` when declared empty
    pub source: Option<Vec<String>>,
    pub mime_type: Option<String>,
    /// `false` forces external deployment
    pub embed: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub locale: Option<String>,
    /// Bundle trait that declares the method, when inherited
    pub owner: Option<TypeName>,
}

impl DeclaredAccessor {
    pub fn new(name: impl Into<String>, result_type: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            result_type: result_type.into(),
            source: None,
            mime_type: None,
            embed: true,
            width: None,
            height: None,
            locale: None,
            owner: None,
        }
    }

    #[must_use]
    pub fn with_source<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub const fn not_embedded(mut self) -> Self {
        self.embed = false;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// The accessor's locale override, else the pass locale
    pub fn effective_locale<'a>(&'a self, pass_locale: Option<&'a str>) -> Option<&'a str> {
        self.locale.as_deref().or(pass_locale)
    }
}

/// A declared resource bundle trait with its accessors in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredBundle {
    pub name: TypeName,
    /// Resource package, dotted or slashed
    pub package: String,
    /// Enclosing type names, outermost first
    pub enclosing: Vec<String>,
    pub supertypes: Vec<TypeName>,
    pub accessors: Vec<DeclaredAccessor>,
}

impl DeclaredBundle {
    pub fn new(name: impl Into<TypeName>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            enclosing: Vec::new(),
            supertypes: Vec::new(),
            accessors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_accessor(mut self, accessor: DeclaredAccessor) -> Self {
        self.accessors.push(accessor);
        self
    }

    /// Resource package as a slash separated path without surrounding slashes
    pub fn package_path(&self) -> String {
        self.package
            .split(['.', '/'])
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn simple_source_name(&self, locale: Option<&str>) -> String {
        generate_simple_source_name(&self.enclosing, self.name.simple_name(), locale)
    }

    /// Path of the generated type, e.g. `crate::assets::IconsImpl`
    pub fn generated_type_path(&self, locale: Option<&str>) -> String {
        let simple = self.simple_source_name(locale);
        match self.name.module_path() {
            "" => simple,
            module => format!("{module}::{simple}"),
        }
    }

    pub fn accessor(&self, name: &str) -> Option<&DeclaredAccessor> {
        self.accessors.iter().find(|accessor| accessor.name == name)
    }
}

/// Simple name of a generated implementation: enclosing names and the type
/// name joined by `_`, an optional `_<locale>_` segment, then `Impl`.
pub fn generate_simple_source_name(
    enclosing: &[String],
    simple_name: &str,
    locale: Option<&str>,
) -> String {
    let mut name = enclosing
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(simple_name))
        .collect::<Vec<_>>()
        .join("_");
    if let Some(locale) = locale {
        name.push('_');
        name.push_str(locale);
        name.push('_');
    }
    name.push_str("Impl");
    name
}
