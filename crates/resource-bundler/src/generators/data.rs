use log::debug;

use super::{ResourceGenerator, name_literal, not_prepared, resolve_single};
use crate::{
    context::ResourceContext,
    dispatch::GeneratorId,
    error::ResourceError,
    mime,
    model::DeclaredAccessor,
    types::FxIndexMap,
};

#[derive(Debug)]
struct DeployedData {
    origin: String,
    url_expression: String,
}

/// Turns arbitrary resources into `DataResourcePrototype`s addressed by URL
#[derive(Debug, Default)]
pub struct DataResourceGenerator {
    deployed: FxIndexMap<String, DeployedData>,
}

impl DataResourceGenerator {
    pub const ID: GeneratorId = GeneratorId("data");
}

impl ResourceGenerator for DataResourceGenerator {
    fn prepare(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        locale: Option<&str>,
    ) -> Result<(), ResourceError> {
        let resource = resolve_single(context, accessor, locale)?;
        let mime_type = accessor
            .mime_type
            .clone()
            .unwrap_or_else(|| mime::probe(&resource.file_name).to_owned());
        debug!("{} is {} bytes of {mime_type}", resource.origin, resource.bytes.len());

        let url_expression = context.deploy(
            &resource.file_name,
            &mime_type,
            &resource.bytes,
            !accessor.embed,
        )?;
        self.deployed.insert(
            accessor.name.clone(),
            DeployedData {
                origin: resource.origin,
                url_expression,
            },
        );
        Ok(())
    }

    fn create_assignment(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        _locale: Option<&str>,
    ) -> Result<String, ResourceError> {
        let deployed = self
            .deployed
            .get(&accessor.name)
            .ok_or_else(|| not_prepared(accessor))?;
        Ok(format!(
            "{}::bundle_runtime::DataResourcePrototype::new({}, {})",
            context.origin_comment(&deployed.origin),
            name_literal(accessor),
            deployed.url_expression
        ))
    }

    fn finish(&mut self, _context: &mut ResourceContext<'_>) -> Result<(), ResourceError> {
        self.deployed.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{generators::test_support::Harness, model::DeclaredBundle, resolver::ResourceOracle};

    fn assignment(accessor: &DeclaredAccessor, oracle: ResourceOracle) -> Result<String, ResourceError> {
        let harness = Harness::new(DeclaredBundle::new("crate::Blobs", "blobs"), oracle);
        let mut context = harness.context(None);
        let mut generator = DataResourceGenerator::default();
        generator.prepare(&mut context, accessor, None)?;
        generator.create_assignment(&mut context, accessor, None)
    }

    #[test]
    fn test_unknown_mime_type() -> Result<(), ResourceError> {
        let accessor = DeclaredAccessor::new("zeros", "DataResource").with_source(["zeros.bin"]);
        let expression = assignment(
            &accessor,
            ResourceOracle::new().with_embedded("blobs/zeros.bin", vec![0_u8; 4]),
        )?;
        assert_eq!(
            expression,
            "::bundle_runtime::DataResourcePrototype::new(\"zeros\", \
             ::std::string::String::from(\"data:content/unknown;base64,AAAAAA==\"))"
        );
        Ok(())
    }

    #[test]
    fn test_mime_override_and_probe() -> Result<(), ResourceError> {
        let probed = DeclaredAccessor::new("style", "DataResource").with_source(["style.css"]);
        let overridden = probed.clone().with_mime_type("text/x-custom");
        let oracle = || ResourceOracle::new().with_embedded("blobs/style.css", "a{}");

        assert!(assignment(&probed, oracle())?.contains("data:text/css;base64,YXt9"));
        assert!(assignment(&overridden, oracle())?.contains("data:text/x-custom;base64,YXt9"));
        Ok(())
    }

    #[test]
    fn test_quoted_mime_override_is_escaped_once() -> Result<(), ResourceError> {
        let accessor = DeclaredAccessor::new("quoted", "DataResource")
            .with_source(["zeros.bin"])
            .with_mime_type(r#"text/x-"q""#);
        let expression = assignment(
            &accessor,
            ResourceOracle::new().with_embedded("blobs/zeros.bin", vec![0_u8; 4]),
        )?;
        assert_eq!(
            expression,
            r#"::bundle_runtime::DataResourcePrototype::new("quoted", ::std::string::String::from("data:text/x-\"q\";base64,AAAAAA=="))"#
        );
        Ok(())
    }

    #[test]
    fn test_not_embedded_without_deploy_dir_fails() {
        let accessor = DeclaredAccessor::new("zeros", "DataResource")
            .with_source(["zeros.bin"])
            .not_embedded();
        let error = assignment(
            &accessor,
            ResourceOracle::new().with_embedded("blobs/zeros.bin", vec![0_u8; 4]),
        )
        .expect_err("inlining refused and nowhere to deploy");
        assert!(matches!(error, ResourceError::InlineLimit { .. }));
    }

    #[test]
    fn test_missing_data_has_no_default_extension() {
        let accessor = DeclaredAccessor::new("missing", "DataResource");
        let error = assignment(&accessor, ResourceOracle::new()).expect_err("nothing declared");
        assert!(matches!(
            error,
            ResourceError::NoDefaultResource { ref extensions } if extensions.is_empty()
        ));
    }
}
