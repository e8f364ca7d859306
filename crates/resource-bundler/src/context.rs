//! State shared by all generators during one generation pass

use std::{any::Any, fmt::Write as _, fs, path::PathBuf, rc::Rc};

use base64::{Engine, engine::general_purpose::STANDARD};
use log::debug;
use sha2::{Digest, Sha256};

use crate::{
    cache::SharedCache,
    code_generator::literal::string_expression,
    dispatch::GeneratorId,
    error::ResourceError,
    model::{DeclaredBundle, TypeHierarchy, TypeName},
    resolver::ResourceOracle,
    types::FxIndexMap,
};

/// Payloads at or above this size are never turned into data URLs
pub const MAX_INLINE_SIZE: usize = 2 << 15;

/// Where resources that are not inlined end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStrategy {
    /// Only data URLs are available
    Inline,
    /// Files are written to `dir` and referenced as `url_prefix` + file name
    External { dir: PathBuf, url_prefix: String },
}

/// Everything a generator may consult while producing code for one bundle
#[derive(Debug)]
pub struct ResourceContext<'a> {
    bundle: &'a DeclaredBundle,
    locale: Option<&'a str>,
    oracle: &'a ResourceOracle,
    hierarchy: &'a dyn TypeHierarchy,
    bundles: &'a FxIndexMap<TypeName, DeclaredBundle>,
    deploy: &'a DeployStrategy,
    strip_comments: bool,
    cache: SharedCache,
    current_generator: Option<GeneratorId>,
}

impl<'a> ResourceContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bundle: &'a DeclaredBundle,
        locale: Option<&'a str>,
        oracle: &'a ResourceOracle,
        hierarchy: &'a dyn TypeHierarchy,
        bundles: &'a FxIndexMap<TypeName, DeclaredBundle>,
        deploy: &'a DeployStrategy,
        strip_comments: bool,
    ) -> Self {
        Self {
            bundle,
            locale,
            oracle,
            hierarchy,
            bundles,
            deploy,
            strip_comments,
            cache: SharedCache::new(),
            current_generator: None,
        }
    }

    pub fn bundle(&self) -> &'a DeclaredBundle {
        self.bundle
    }

    /// Locale of the pass, independent of accessor overrides
    pub fn locale(&self) -> Option<&'a str> {
        self.locale
    }

    pub fn oracle(&self) -> &'a ResourceOracle {
        self.oracle
    }

    pub fn hierarchy(&self) -> &'a dyn TypeHierarchy {
        self.hierarchy
    }

    /// Look up another declared bundle, used for nested bundle accessors
    pub fn declared_bundle(&self, name: &TypeName) -> Option<&'a DeclaredBundle> {
        self.bundles.get(name)
    }

    pub fn supports_external_deploy(&self) -> bool {
        matches!(self.deploy, DeployStrategy::External { .. })
    }

    /// `// <origin>` line placed before an initializer, unless comments are stripped
    pub fn origin_comment(&self, origin: &str) -> String {
        if self.strip_comments {
            String::new()
        } else {
            format!("// {}\n", origin.replace(['\n', '\r'], " "))
        }
    }

    pub fn set_current_generator(&mut self, generator: GeneratorId) {
        self.current_generator = Some(generator);
    }

    /// Value the active generator stored under `key`, created on first use
    pub fn shared<T: Any>(
        &mut self,
        key: &str,
        create: impl FnOnce() -> T,
    ) -> Result<Rc<T>, ResourceError> {
        let generator = self
            .current_generator
            .ok_or_else(|| ResourceError::generation("shared cache used outside a generator"))?;
        Ok(self.cache.get_or_insert_with(generator, key, create))
    }

    /// Make `data` available at runtime and return a Rust expression
    /// evaluating to its URL as a `String`.
    ///
    /// Payloads below [`MAX_INLINE_SIZE`] become `data:` URLs unless
    /// `force_external` is set. Everything else is written to the deployment
    /// directory, which fails when none is configured.
    pub fn deploy(
        &self,
        file_name: &str,
        mime_type: &str,
        data: &[u8],
        force_external: bool,
    ) -> Result<String, ResourceError> {
        if !force_external && data.len() < MAX_INLINE_SIZE {
            let url = format!("data:{mime_type};base64,{}", STANDARD.encode(data));
            return Ok(string_expression(&url));
        }

        match self.deploy {
            DeployStrategy::External { dir, url_prefix } => {
                let deployed_name = content_hashed_name(file_name, data);
                let target = dir.join(&deployed_name);
                if !target.exists() {
                    fs::create_dir_all(dir).map_err(|source| ResourceError::FatalWrite {
                        target: dir.display().to_string(),
                        source,
                    })?;
                    fs::write(&target, data).map_err(|source| ResourceError::FatalWrite {
                        target: target.display().to_string(),
                        source,
                    })?;
                }
                debug!("Deployed {file_name} as {}", target.display());
                Ok(string_expression(&format!("{url_prefix}{deployed_name}")))
            }
            DeployStrategy::Inline => Err(ResourceError::InlineLimit {
                origin: file_name.to_owned(),
                size: data.len(),
                limit: MAX_INLINE_SIZE,
            }),
        }
    }
}

/// `<sha256 prefix>.<extension>` so identical payloads share one file
fn content_hashed_name(file_name: &str, data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut name = String::with_capacity(40);
    for byte in &digest[..16] {
        let _ = write!(name, "{byte:02x}");
    }
    if let Some((_, extension)) = file_name.rsplit_once('.') {
        if !extension.is_empty() {
            name.push('.');
            name.push_str(&extension.to_ascii_lowercase());
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::model::StaticTypeHierarchy;

    struct Fixture {
        bundle: DeclaredBundle,
        oracle: ResourceOracle,
        hierarchy: StaticTypeHierarchy,
        bundles: FxIndexMap<TypeName, DeclaredBundle>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                bundle: DeclaredBundle::new("crate::Icons", "icons"),
                oracle: ResourceOracle::new(),
                hierarchy: StaticTypeHierarchy::new(),
                bundles: FxIndexMap::default(),
            }
        }

        fn context<'a>(&'a self, deploy: &'a DeployStrategy) -> ResourceContext<'a> {
            ResourceContext::new(
                &self.bundle,
                Some("fr"),
                &self.oracle,
                &self.hierarchy,
                &self.bundles,
                deploy,
                false,
            )
        }
    }

    #[test]
    fn test_small_payload_becomes_data_url() -> Result<()> {
        let fixture = Fixture::new();
        let context = fixture.context(&DeployStrategy::Inline);

        let expression = context.deploy("blob", "content/unknown", &[0, 0, 0, 0], false)?;
        assert_eq!(
            expression,
            r#"::std::string::String::from("data:content/unknown;base64,AAAAAA==")"#
        );
        Ok(())
    }

    #[test]
    fn test_oversized_payload_without_deploy_dir_fails() {
        let fixture = Fixture::new();
        let context = fixture.context(&DeployStrategy::Inline);

        let data = vec![0_u8; MAX_INLINE_SIZE];
        let error = context
            .deploy("big.bin", "content/unknown", &data, false)
            .expect_err("too large to inline");
        assert!(matches!(error, ResourceError::InlineLimit { size, .. } if size == MAX_INLINE_SIZE));
    }

    #[test]
    fn test_forced_external_deploy_writes_hashed_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let fixture = Fixture::new();
        let deploy = DeployStrategy::External {
            dir: temp_dir.path().join("public"),
            url_prefix: "/static/".to_owned(),
        };
        let context = fixture.context(&deploy);

        let expression = context.deploy("Logo.PNG", "image/png", b"png-bytes", true)?;
        let name = content_hashed_name("Logo.PNG", b"png-bytes");
        assert!(name.ends_with(".png"));
        assert_eq!(
            expression,
            format!("::std::string::String::from(\"/static/{name}\")")
        );
        assert_eq!(fs::read(temp_dir.path().join("public").join(&name))?, b"png-bytes");
        Ok(())
    }

    #[test]
    fn test_shared_state_is_scoped_to_the_active_generator() -> Result<()> {
        let fixture = Fixture::new();
        let mut context = fixture.context(&DeployStrategy::Inline);

        assert!(context.shared("key", || 1_u8).is_err());
        context.set_current_generator(GeneratorId("image"));
        assert_eq!(*context.shared("key", || 1_u8)?, 1);
        assert_eq!(*context.shared("key", || 2_u8)?, 1);

        context.set_current_generator(GeneratorId("text"));
        assert_eq!(*context.shared("key", || 3_u8)?, 3);
        Ok(())
    }

    #[test]
    fn test_origin_comment_is_single_line() {
        let fixture = Fixture::new();
        let context = fixture.context(&DeployStrategy::Inline);
        assert_eq!(context.origin_comment("a\nb"), "// a b\n");
    }
}
