use std::{cell::RefCell, rc::Rc};

use log::debug;

use super::{ResourceGenerator, name_literal, not_prepared, resolve_single};
use crate::{
    context::ResourceContext,
    dispatch::GeneratorId,
    error::ResourceError,
    fields::FieldRegistry,
    image_info,
    model::DeclaredAccessor,
    types::FxIndexMap,
};

/// One deployed image payload, shared by every accessor that uses it
#[derive(Debug)]
struct DeployedImage {
    url_expression: String,
    field: Option<String>,
}

/// Final geometry of one accessor's image
#[derive(Debug, Clone)]
struct ImageRect {
    origin: String,
    image_key: String,
    width: u32,
    height: u32,
    animated: bool,
    lossy: bool,
}

#[derive(Debug, Default)]
struct ImageState {
    images: FxIndexMap<String, DeployedImage>,
    rects: FxIndexMap<String, ImageRect>,
}

/// Produces `ImageResourcePrototype`s.
///
/// Identical payloads with the same embedding decision are deployed once and
/// referenced through one shared `String` field.
#[derive(Debug, Default)]
pub struct ImageResourceGenerator {
    state: Option<Rc<RefCell<ImageState>>>,
}

impl ImageResourceGenerator {
    pub const ID: GeneratorId = GeneratorId("image");

    fn state(&self) -> Result<&Rc<RefCell<ImageState>>, ResourceError> {
        self.state
            .as_ref()
            .ok_or_else(|| ResourceError::generation("image generator used before init"))
    }
}

/// Display size honoring overrides; a single override keeps the aspect ratio
fn scaled_size(
    intrinsic_width: u32,
    intrinsic_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let scale = |target: u32, from: u32, other: u32| {
        if from == 0 {
            0
        } else {
            let from = u64::from(from);
            let scaled = (u64::from(target) * u64::from(other) + from / 2) / from;
            u32::try_from(scaled).unwrap_or(u32::MAX)
        }
    };
    match (width.filter(|w| *w > 0), height.filter(|h| *h > 0)) {
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => (width, scale(width, intrinsic_width, intrinsic_height)),
        (None, Some(height)) => (scale(height, intrinsic_height, intrinsic_width), height),
        (None, None) => (intrinsic_width, intrinsic_height),
    }
}

impl ResourceGenerator for ImageResourceGenerator {
    fn init(&mut self, context: &mut ResourceContext<'_>) -> Result<(), ResourceError> {
        let key = format!(
            "{}:{}:{}",
            context.bundle().name,
            context.supports_external_deploy(),
            context.locale().unwrap_or_default()
        );
        let state = context.shared(&key, || RefCell::new(ImageState::default()))?;
        self.state = Some(state);
        Ok(())
    }

    fn prepare(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        locale: Option<&str>,
    ) -> Result<(), ResourceError> {
        let resource = resolve_single(context, accessor, locale)?;
        let info = image_info::sniff(&resource.bytes).ok_or_else(|| {
            ResourceError::UnrecognizedImage {
                origin: resource.origin.clone(),
            }
        })?;
        let (width, height) = scaled_size(info.width, info.height, accessor.width, accessor.height);
        let force_external = !accessor.embed;
        let image_key = format!("{}:{force_external}", resource.origin);

        let mut state = self.state()?.borrow_mut();
        if state.images.contains_key(&image_key) {
            debug!("Reusing deployed image {image_key} for {}", accessor.name);
        } else {
            let url_expression = context.deploy(
                &resource.file_name,
                info.format.mime_type(),
                &resource.bytes,
                force_external,
            )?;
            state.images.insert(
                image_key.clone(),
                DeployedImage {
                    url_expression,
                    field: None,
                },
            );
        }
        state.rects.insert(
            accessor.name.clone(),
            ImageRect {
                origin: resource.origin,
                image_key,
                width,
                height,
                animated: info.animated,
                lossy: info.lossy,
            },
        );
        Ok(())
    }

    fn create_fields(
        &mut self,
        _context: &mut ResourceContext<'_>,
        fields: &mut FieldRegistry,
    ) -> Result<(), ResourceError> {
        let mut state = self.state()?.borrow_mut();
        for image in state.images.values_mut() {
            if image.field.is_none() {
                let ident = fields.define(
                    "::std::string::String",
                    "externalImage",
                    Some(&image.url_expression),
                    true,
                    true,
                );
                image.field = Some(ident);
            }
        }
        Ok(())
    }

    fn create_assignment(
        &mut self,
        context: &mut ResourceContext<'_>,
        accessor: &DeclaredAccessor,
        _locale: Option<&str>,
    ) -> Result<String, ResourceError> {
        let state = self.state()?.borrow();
        let rect = state
            .rects
            .get(&accessor.name)
            .ok_or_else(|| not_prepared(accessor))?;
        let field = state
            .images
            .get(&rect.image_key)
            .and_then(|image| image.field.as_deref())
            .ok_or_else(|| {
                ResourceError::generation(format!("no image field was created for {}", accessor.name))
            })?;
        Ok(format!(
            "{}::bundle_runtime::ImageResourcePrototype::new({}, ::std::string::String::clone(&{}), \
             0, 0, {}, {}, {}, {})",
            context.origin_comment(&rect.origin),
            name_literal(accessor),
            field,
            rect.width,
            rect.height,
            rect.animated,
            rect.lossy
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        generators::test_support::Harness,
        image_info::fixtures,
        model::DeclaredBundle,
        resolver::ResourceOracle,
    };

    #[test]
    fn test_scaled_size() {
        assert_eq!(scaled_size(64, 64, Some(32), None), (32, 32));
        assert_eq!(scaled_size(100, 50, None, Some(25)), (50, 25));
        assert_eq!(scaled_size(3, 7, Some(2), None), (2, 5));
        assert_eq!(scaled_size(64, 48, Some(10), Some(20)), (10, 20));
        assert_eq!(scaled_size(64, 48, Some(0), None), (64, 48));
    }

    #[test]
    fn test_width_override_preserves_aspect_ratio() -> Result<(), ResourceError> {
        let accessor = DeclaredAccessor::new("icon", "ImageResource").with_size(Some(32), None);
        let harness = Harness::new(
            DeclaredBundle::new("crate::Icons", "icons"),
            ResourceOracle::new().with_embedded("icons/icon.png", fixtures::png(64, 64)),
        );
        let mut context = harness.context(None);
        context.set_current_generator(ImageResourceGenerator::ID);
        let mut fields = FieldRegistry::new();
        let mut generator = ImageResourceGenerator::default();

        generator.init(&mut context)?;
        generator.prepare(&mut context, &accessor, None)?;
        generator.create_fields(&mut context, &mut fields)?;
        let expression = generator.create_assignment(&mut context, &accessor, None)?;

        assert_eq!(
            expression,
            "::bundle_runtime::ImageResourcePrototype::new(\"icon\", \
             ::std::string::String::clone(&EXTERNAL_IMAGE), 0, 0, 32, 32, false, false)"
        );
        let field = fields.get("EXTERNAL_IMAGE").expect("image field defined");
        assert!(
            field
                .initializer
                .as_deref()
                .is_some_and(|init| init.contains("data:image/png;base64,"))
        );
        Ok(())
    }

    #[test]
    fn test_identical_images_share_one_field() -> Result<(), ResourceError> {
        let small = DeclaredAccessor::new("small", "ImageResource")
            .with_source(["logo.gif"])
            .with_size(Some(8), None);
        let large = DeclaredAccessor::new("large", "ImageResource").with_source(["logo.gif"]);
        let other = DeclaredAccessor::new("other", "ImageResource").with_source(["other.gif"]);
        let harness = Harness::new(
            DeclaredBundle::new("crate::Icons", "icons"),
            ResourceOracle::new()
                .with_embedded("icons/logo.gif", fixtures::gif(16, 16, 2))
                .with_embedded("icons/other.gif", fixtures::gif(4, 4, 1)),
        );
        let mut context = harness.context(None);
        context.set_current_generator(ImageResourceGenerator::ID);
        let mut fields = FieldRegistry::new();
        let mut generator = ImageResourceGenerator::default();

        generator.init(&mut context)?;
        for accessor in [&small, &large, &other] {
            generator.prepare(&mut context, accessor, None)?;
        }
        generator.create_fields(&mut context, &mut fields)?;

        assert_eq!(fields.len(), 2);
        let small_expr = generator.create_assignment(&mut context, &small, None)?;
        let large_expr = generator.create_assignment(&mut context, &large, None)?;
        let other_expr = generator.create_assignment(&mut context, &other, None)?;
        assert!(small_expr.ends_with("clone(&EXTERNAL_IMAGE), 0, 0, 8, 8, true, false)"));
        assert!(large_expr.ends_with("clone(&EXTERNAL_IMAGE), 0, 0, 16, 16, true, false)"));
        assert!(other_expr.ends_with("clone(&EXTERNAL_IMAGE_0), 0, 0, 4, 4, false, false)"));
        Ok(())
    }

    #[test]
    fn test_unrecognized_image() {
        let accessor = DeclaredAccessor::new("icon", "ImageResource").with_source(["icon.png"]);
        let harness = Harness::new(
            DeclaredBundle::new("crate::Icons", ""),
            ResourceOracle::new().with_embedded("icon.png", "not a png"),
        );
        let mut context = harness.context(None);
        context.set_current_generator(ImageResourceGenerator::ID);
        let mut generator = ImageResourceGenerator::default();

        let result = generator
            .init(&mut context)
            .and_then(|()| generator.prepare(&mut context, &accessor, None));
        assert!(matches!(result, Err(ResourceError::UnrecognizedImage { .. })));
    }
}
