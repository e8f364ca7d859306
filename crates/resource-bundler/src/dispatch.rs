//! Mapping from declared result types to resource generators

use std::fmt;

use log::debug;

use crate::{
    error::{Diagnostics, ResourceError},
    generators::{
        BundleResourceGenerator, DataResourceGenerator, ImageResourceGenerator, ResourceGenerator,
        TextResourceGenerator,
    },
    model::{DeclaredAccessor, DeclaredBundle, TypeHierarchy, TypeName, all_parents, builtin},
    orchestrator::PassState,
    types::FxIndexMap,
};

/// Stable identity of a generator kind, also used to namespace the shared cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(pub &'static str);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Creates fresh generator instances of one kind
#[derive(Debug, Clone, Copy)]
pub struct GeneratorFactory {
    pub id: GeneratorId,
    pub create: fn() -> Box<dyn ResourceGenerator>,
}

fn create_default<G: ResourceGenerator + Default + 'static>() -> Box<dyn ResourceGenerator> {
    Box::new(G::default())
}

impl GeneratorFactory {
    pub fn of<G: ResourceGenerator + Default + 'static>(id: GeneratorId) -> Self {
        Self {
            id,
            create: create_default::<G>,
        }
    }

    pub fn instantiate(&self) -> Box<dyn ResourceGenerator> {
        (self.create)()
    }
}

impl PartialEq for GeneratorFactory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GeneratorFactory {}

/// A generator together with the accessors assigned to it, in declaration order
#[derive(Debug, Clone)]
pub struct GenerationTask<'a> {
    pub generator: GeneratorFactory,
    pub accessors: Vec<&'a DeclaredAccessor>,
}

/// Registry of generators keyed by the result type they handle
#[derive(Debug, Clone)]
pub struct GeneratorRegistry {
    generators: FxIndexMap<TypeName, GeneratorFactory>,
    /// Used for types whose only parent is the universal root
    nested: GeneratorFactory,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl GeneratorRegistry {
    /// Empty registry that only knows the nested bundle fallback
    pub fn new(nested: GeneratorFactory) -> Self {
        Self {
            generators: FxIndexMap::default(),
            nested,
        }
    }

    /// Registry with the text, data, image and bundle generators
    pub fn with_defaults() -> Self {
        let nested = GeneratorFactory::of::<BundleResourceGenerator>(BundleResourceGenerator::ID);
        let mut registry = Self::new(nested);
        registry.register(
            builtin::TEXT_RESOURCE,
            GeneratorFactory::of::<TextResourceGenerator>(TextResourceGenerator::ID),
        );
        registry.register(
            builtin::DATA_RESOURCE,
            GeneratorFactory::of::<DataResourceGenerator>(DataResourceGenerator::ID),
        );
        registry.register(
            builtin::IMAGE_RESOURCE,
            GeneratorFactory::of::<ImageResourceGenerator>(ImageResourceGenerator::ID),
        );
        registry.register(builtin::CLIENT_BUNDLE, nested);
        registry
    }

    pub fn register(&mut self, ty: impl Into<TypeName>, factory: GeneratorFactory) {
        self.generators.insert(ty.into(), factory);
    }

    /// Find the generator responsible for `ty`.
    ///
    /// A direct registration wins. Otherwise the supertype closure is searched
    /// from its last discovered entry back to its first, so for
    /// `Both: Left + Right` the registrations of `Right`'s ancestry are seen
    /// before `Left`'s. A type whose only parent is the root is a nested bundle.
    pub fn resolve(
        &self,
        hierarchy: &dyn TypeHierarchy,
        ty: &TypeName,
    ) -> Result<GeneratorFactory, ResourceError> {
        if let Some(factory) = self.generators.get(ty) {
            return Ok(*factory);
        }

        let parents = all_parents(hierarchy, ty)
            .ok_or_else(|| ResourceError::NoGenerator { ty: ty.clone() })?;

        // No declared supertypes means the root is the implicit single parent
        let only_root = parents.is_empty() || (parents.len() == 1 && parents[0].is_root());
        if only_root {
            debug!("{ty} only extends the root type, treating it as a nested bundle");
            return Ok(self.nested);
        }

        parents
            .iter()
            .rev()
            .find_map(|parent| self.generators.get(parent).copied())
            .ok_or_else(|| ResourceError::NoGenerator { ty: ty.clone() })
    }

    /// Group the bundle's accessors by generator, reporting every accessor
    /// that cannot be dispatched
    pub fn build_tasks<'a>(
        &self,
        hierarchy: &dyn TypeHierarchy,
        bundle: &'a DeclaredBundle,
        diagnostics: &mut Diagnostics,
    ) -> Vec<GenerationTask<'a>> {
        let mut tasks: FxIndexMap<GeneratorId, GenerationTask<'a>> = FxIndexMap::default();
        for accessor in &bundle.accessors {
            match self.resolve(hierarchy, &accessor.result_type) {
                Ok(factory) => {
                    debug!("{}::{} -> {}", bundle.name, accessor.name, factory.id);
                    tasks
                        .entry(factory.id)
                        .or_insert_with(|| GenerationTask {
                            generator: factory,
                            accessors: Vec::new(),
                        })
                        .accessors
                        .push(accessor);
                }
                Err(error) => diagnostics.report(
                    &bundle.name,
                    Some(accessor.name.as_str()),
                    PassState::Initializing,
                    error,
                ),
            }
        }
        tasks.into_values().collect()
    }
}
