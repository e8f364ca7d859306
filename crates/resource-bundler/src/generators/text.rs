use log::debug;

use super::{ResourceGenerator, name_literal, not_prepared, resolve_single};
use crate::{
    code_generator::literal::string_expression,
    context::ResourceContext,
    dispatch::GeneratorId,
    error::ResourceError,
    model::DeclaredAccessor,
    types::FxIndexMap,
};

#[derive(Debug)]
struct PreparedText {
    origin: String,
    text: String,
}

/// Embeds UTF-8 resources as `TextResourcePrototype`s
#[derive(Debug, Default)]
pub struct TextResourceGenerator {
    prepared: FxIndexMap<String, PreparedText>,
}

impl TextResourceGenerator {
    pub const ID: GeneratorId = GeneratorId("text");
}

impl ResourceGenerator for TextResourceGenerator {
    fn prepare(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        locale: Option<&str>,
    ) -> Result<(), ResourceError> {
        let resource = resolve_single(context, accessor, locale)?;
        let text = String::from_utf8(resource.bytes).map_err(|_| ResourceError::InvalidText {
            origin: resource.origin.clone(),
        })?;
        debug!("Read {} characters for {}", text.chars().count(), accessor.name);
        self.prepared.insert(
            accessor.name.clone(),
            PreparedText {
                origin: resource.origin,
                text,
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
        let prepared = self
            .prepared
            .get(&accessor.name)
            .ok_or_else(|| not_prepared(accessor))?;
        Ok(format!(
            "{}::bundle_runtime::TextResourcePrototype::new({}, {})",
            context.origin_comment(&prepared.origin),
            name_literal(accessor),
            string_expression(&prepared.text)
        ))
    }

    fn finish(&mut self, _context: &mut ResourceContext<'_>) -> Result<(), ResourceError> {
        self.prepared.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{generators::test_support::Harness, model::DeclaredBundle, resolver::ResourceOracle};

    #[test]
    fn test_text_assignment() -> Result<(), ResourceError> {
        let accessor = DeclaredAccessor::new("greeting", "TextResource");
        let harness = Harness::new(
            DeclaredBundle::new("crate::Messages", "msg").with_accessor(accessor.clone()),
            ResourceOracle::new().with_embedded("msg/greeting.txt", "say \"hi\"\n"),
        );
        let mut context = harness.context(None);
        let mut generator = TextResourceGenerator::default();

        generator.prepare(&mut context, &accessor, None)?;
        let expression = generator.create_assignment(&mut context, &accessor, None)?;
        assert_snapshot!(expression, @r#"::bundle_runtime::TextResourcePrototype::new("greeting", ::std::string::String::from("say \"hi\"\n"))"#);
        Ok(())
    }

    #[test]
    fn test_locale_specific_text() -> Result<(), ResourceError> {
        let accessor = DeclaredAccessor::new("greeting", "TextResource");
        let harness = Harness::new(
            DeclaredBundle::new("crate::Messages", "msg"),
            ResourceOracle::new()
                .with_embedded("msg/greeting.txt", "hello")
                .with_embedded("msg/greeting_fr.txt", "bonjour"),
        );
        let mut context = harness.context(Some("fr_CA"));
        let mut generator = TextResourceGenerator::default();

        generator.prepare(&mut context, &accessor, Some("fr_CA"))?;
        let expression = generator.create_assignment(&mut context, &accessor, Some("fr_CA"))?;
        assert!(expression.ends_with(r#"String::from("bonjour"))"#));
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_is_a_generation_error() {
        let accessor = DeclaredAccessor::new("blob", "TextResource");
        let harness = Harness::new(
            DeclaredBundle::new("crate::Messages", ""),
            ResourceOracle::new().with_embedded("blob.txt", vec![0xFF, 0xFE]),
        );
        let mut context = harness.context(None);
        let mut generator = TextResourceGenerator::default();

        let error = generator
            .prepare(&mut context, &accessor, None)
            .expect_err("invalid utf-8");
        assert_eq!(error.to_string(), "embedded:blob.txt is not valid UTF-8 text");
    }
}
