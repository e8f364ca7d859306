use super::ResourceGenerator;
use crate::{
    context::ResourceContext,
    dispatch::GeneratorId,
    error::ResourceError,
    model::{DeclaredAccessor, generate_simple_source_name},
};

/// Instantiates the generated implementation of a nested bundle.
///
/// Accessors whose result type is itself a bundle trait land here. The value
/// is not a resource, so it stays out of `resources()` and `resource(name)`.
#[derive(Debug, Default)]
pub struct BundleResourceGenerator;

impl BundleResourceGenerator {
    pub const ID: GeneratorId = GeneratorId("bundle");
}

impl ResourceGenerator for BundleResourceGenerator {
    fn create_assignment(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        locale: Option<&str>,
    ) -> Result<String, ResourceError> {
        let path = match context.declared_bundle(&accessor.result_type) {
            Some(nested) => nested.generated_type_path(locale),
            None => {
                let ty = &accessor.result_type;
                let simple = generate_simple_source_name(&[], ty.simple_name(), locale);
                match ty.module_path() {
                    "" => simple,
                    module => format!("{module}::{simple}"),
                }
            }
        };
        Ok(format!("{path}::new()"))
    }

    fn produces_prototype(&self) -> bool {
        false
    }
}
