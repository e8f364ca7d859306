//! Pluggable resource generators
//!
//! Every generator follows the same protocol for one pass over one bundle:
//! `init` once, `prepare` per accessor, `create_fields` once, then
//! `create_assignment` per accessor and finally `finish`. All `create_fields`
//! calls of a pass happen before the first `create_assignment`, so an
//! initializer may refer to a field defined by any generator.

mod bundle;
mod data;
mod image;
mod text;

pub use bundle::BundleResourceGenerator;
pub use data::DataResourceGenerator;
pub use image::ImageResourceGenerator;
pub use text::TextResourceGenerator;

use crate::{
    context::ResourceContext,
    error::ResourceError,
    fields::FieldRegistry,
    model::{DeclaredAccessor, find_default_extensions},
    resolver::{ResolvedResource, ResourceHandle},
};

pub trait ResourceGenerator {
    fn init(&mut self, _context: &mut ResourceContext<'_>) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Resolve and validate whatever `accessor` needs. `locale` already
    /// accounts for the accessor's own override.
    fn prepare(
        &mut self,
        _context: &mut ResourceContext<'_>,
        _accessor: &DeclaredAccessor,
        _locale: Option<&str>,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_fields(
        &mut self,
        _context: &mut ResourceContext<'_>,
        _fields: &mut FieldRegistry,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Expression producing the accessor's value
    fn create_assignment(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        locale: Option<&str>,
    ) -> Result<String, ResourceError>;

    fn finish(&mut self, _context: &mut ResourceContext<'_>) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Whether values are listed by `resources()` and `resource(name)`
    fn produces_prototype(&self) -> bool {
        true
    }
}

/// The single resource of a candidate list
pub fn exactly_one(mut handles: Vec<ResourceHandle>) -> Result<ResourceHandle, ResourceError> {
    if handles.len() == 1 {
        if let Some(handle) = handles.pop() {
            return Ok(handle);
        }
    }
    Err(ResourceError::Cardinality {
        found: handles.len(),
    })
}

/// Locate and load the one resource backing `accessor`
pub fn resolve_single(
    context: &ResourceContext<'_>,
    accessor: &DeclaredAccessor,
    locale: Option<&str>,
) -> Result<ResolvedResource, ResourceError> {
    let extensions = find_default_extensions(context.hierarchy(), &accessor.result_type);
    let handles = context
        .oracle()
        .find_resources(context.bundle(), accessor, &extensions, locale)?;
    let handle = exactly_one(handles)?;
    context.oracle().load(&handle)
}

/// Error for a phase invoked on an accessor that was never prepared
fn not_prepared(accessor: &DeclaredAccessor) -> ResourceError {
    ResourceError::generation(format!("{} was not prepared", accessor.name))
}

/// Name literal as it appears in generated prototypes
fn name_literal(accessor: &DeclaredAccessor) -> String {
    format!("\"{}\"", crate::code_generator::literal::escape(&accessor.name))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        context::{DeployStrategy, ResourceContext},
        model::{DeclaredBundle, StaticTypeHierarchy, TypeName},
        resolver::ResourceOracle,
        types::FxIndexMap,
    };

    /// Owns everything a [`ResourceContext`] borrows
    pub(crate) struct Harness {
        pub(crate) bundle: DeclaredBundle,
        pub(crate) oracle: ResourceOracle,
        pub(crate) hierarchy: StaticTypeHierarchy,
        pub(crate) bundles: FxIndexMap<TypeName, DeclaredBundle>,
        pub(crate) deploy: DeployStrategy,
    }

    impl Harness {
        pub(crate) fn new(bundle: DeclaredBundle, oracle: ResourceOracle) -> Self {
            Self {
                bundle,
                oracle,
                hierarchy: StaticTypeHierarchy::new(),
                bundles: FxIndexMap::default(),
                deploy: DeployStrategy::Inline,
            }
        }

        pub(crate) fn context(&self, locale: Option<&'static str>) -> ResourceContext<'_> {
            ResourceContext::new(
                &self.bundle,
                locale,
                &self.oracle,
                &self.hierarchy,
                &self.bundles,
                &self.deploy,
                true,
            )
        }
    }
}
