//! Generation passes over declared bundles
//!
//! One pass produces the implementation of one bundle for one locale and moves
//! through `Initializing → Preparing → Emitting → Finishing → Done`. Each
//! phase runs to completion and collects every error it meets; the pass fails
//! at the end of the first phase that reported anything, and nothing is
//! written for a failed pass.

use std::{fmt, iter, mem, path::PathBuf};

use log::{debug, info, warn};

use crate::{
    code_generator::{AccessorCode, TypeAssembly, slot_type},
    config::Config,
    context::{DeployStrategy, ResourceContext},
    dispatch::{GenerationTask, GeneratorId, GeneratorRegistry},
    error::{Diagnostic, Diagnostics, GenerationFailed, ResourceError},
    fields::FieldRegistry,
    generators::ResourceGenerator,
    model::{DeclaredAccessor, DeclaredBundle, TypeHierarchy, TypeName, all_parents},
    resolver::ResourceOracle,
    sink::OutputSink,
    types::FxIndexMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    Initializing,
    Preparing,
    Emitting,
    Finishing,
    Done,
    Failed,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Preparing => "preparing",
            Self::Emitting => "emitting",
            Self::Finishing => "finishing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A type produced by a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedType {
    pub bundle: TypeName,
    pub locale: Option<String>,
    /// e.g. `crate::assets::Icons_fr_Impl`
    pub qualified_name: String,
    /// File written by the sink, if it writes files
    pub path: Option<PathBuf>,
}

/// Outcome of generating every bundle for every locale
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub generated: Vec<GeneratedType>,
    /// Passes skipped because their type had already been produced
    pub skipped: usize,
    pub failures: Vec<GenerationFailed>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every diagnostic of every failed pass
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.failures
            .iter()
            .flat_map(|failure| failure.diagnostics.iter())
    }
}

/// Run-wide generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub deploy: DeployStrategy,
    pub strip_comments: bool,
    /// Locales generated in addition to the locale-independent pass
    pub locales: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            deploy: DeployStrategy::Inline,
            strip_comments: false,
            locales: Vec::new(),
        }
    }
}

impl GenerationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deploy: config.deploy_strategy(),
            strip_comments: config.strip_comments,
            locales: config.locales.clone(),
        }
    }
}

/// Bookkeeping of one pass
struct Pass<'p> {
    bundle: &'p DeclaredBundle,
    locale: Option<&'p str>,
    state: PassState,
    diagnostics: Diagnostics,
}

impl<'p> Pass<'p> {
    fn new(bundle: &'p DeclaredBundle, locale: Option<&'p str>) -> Self {
        Self {
            bundle,
            locale,
            state: PassState::Initializing,
            diagnostics: Diagnostics::new(),
        }
    }

    fn advance(&mut self, next: PassState) {
        debug!(
            "{} [{}]: {} -> {}",
            self.bundle.name,
            self.locale.unwrap_or("default"),
            self.state,
            next
        );
        self.state = next;
    }

    fn report(&mut self, accessor: Option<&str>, error: ResourceError) {
        self.diagnostics
            .report(&self.bundle.name, accessor, self.state, error);
    }

    /// Fail the pass if the current phase reported anything
    fn check(&mut self) -> Result<(), GenerationFailed> {
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    fn fail(&mut self) -> GenerationFailed {
        self.advance(PassState::Failed);
        GenerationFailed {
            bundle: self.bundle.name.clone(),
            locale: self.locale.map(str::to_owned),
            diagnostics: mem::take(&mut self.diagnostics).into_vec(),
        }
    }
}

/// A generator instance with the accessors it serves
struct ActiveGenerator<'t> {
    id: GeneratorId,
    generator: Box<dyn ResourceGenerator>,
    accessors: &'t [&'t DeclaredAccessor],
}

/// Drives generation passes for a set of declared bundles
#[derive(Debug)]
pub struct BundleOrchestrator<'a> {
    hierarchy: &'a dyn TypeHierarchy,
    bundles: &'a FxIndexMap<TypeName, DeclaredBundle>,
    oracle: &'a ResourceOracle,
    registry: GeneratorRegistry,
    options: GenerationOptions,
}

impl<'a> BundleOrchestrator<'a> {
    pub fn new(
        hierarchy: &'a dyn TypeHierarchy,
        bundles: &'a FxIndexMap<TypeName, DeclaredBundle>,
        oracle: &'a ResourceOracle,
        options: GenerationOptions,
    ) -> Self {
        Self {
            hierarchy,
            bundles,
            oracle,
            registry: GeneratorRegistry::with_defaults(),
            options,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: GeneratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Generate every declared bundle, once without a locale and once per
    /// configured locale. A failing pass does not stop the others.
    pub fn generate_all(&self, sink: &mut dyn OutputSink) -> GenerationReport {
        let locales: Vec<Option<&str>> = iter::once(None)
            .chain(self.options.locales.iter().map(|locale| Some(locale.as_str())))
            .collect();

        let mut report = GenerationReport::default();
        for bundle in self.bundles.values() {
            for &locale in &locales {
                match self.generate(bundle, locale, sink) {
                    Ok(Some(generated)) => report.generated.push(generated),
                    Ok(None) => report.skipped += 1,
                    Err(failed) => {
                        warn!("{failed}");
                        report.failures.push(failed);
                    }
                }
            }
        }
        info!(
            "Generated {} type(s), skipped {}, {} failed pass(es)",
            report.generated.len(),
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// Run one pass for `bundle`. `Ok(None)` means the sink already holds the type.
    pub fn generate(
        &self,
        bundle: &DeclaredBundle,
        locale: Option<&str>,
        sink: &mut dyn OutputSink,
    ) -> Result<Option<GeneratedType>, GenerationFailed> {
        let mut pass = Pass::new(bundle, locale);
        let simple_name = bundle.simple_source_name(locale);

        let pending = match sink.try_create(bundle.name.module_path(), &simple_name) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                debug!("{simple_name} was already generated, skipping");
                return Ok(None);
            }
            Err(error) => {
                pass.report(None, error);
                return Err(pass.fail());
            }
        };

        let tasks = self
            .registry
            .build_tasks(self.hierarchy, bundle, &mut pass.diagnostics);
        pass.check()?;

        let mut context = ResourceContext::new(
            bundle,
            locale,
            self.oracle,
            self.hierarchy,
            self.bundles,
            &self.options.deploy,
            self.options.strip_comments,
        );

        pass.advance(PassState::Preparing);
        let mut generators = Self::prepare(&mut pass, &mut context, &tasks);
        pass.check()?;

        pass.advance(PassState::Emitting);
        let source = self.emit(&mut pass, &mut context, &mut generators, &simple_name);
        pass.check()?;

        pass.advance(PassState::Finishing);
        for active in &mut generators {
            context.set_current_generator(active.id);
            if let Err(error) = active.generator.finish(&mut context) {
                pass.report(None, error);
            }
        }
        pass.check()?;

        let qualified_name = pending.qualified_name();
        let path = match sink.commit(pending, source) {
            Ok(path) => path,
            Err(error) => {
                pass.report(None, error);
                return Err(pass.fail());
            }
        };
        pass.advance(PassState::Done);
        info!("Generated {qualified_name}");

        Ok(Some(GeneratedType {
            bundle: bundle.name.clone(),
            locale: locale.map(str::to_owned),
            qualified_name,
            path,
        }))
    }

    /// Instantiate one generator per task, then `init` and `prepare` it
    fn prepare<'t>(
        pass: &mut Pass<'_>,
        context: &mut ResourceContext<'_>,
        tasks: &'t [GenerationTask<'t>],
    ) -> Vec<ActiveGenerator<'t>> {
        let mut generators = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task.generator.id;
            let mut generator = task.generator.instantiate();
            context.set_current_generator(id);
            match generator.init(context) {
                Ok(()) => {
                    for accessor in &task.accessors {
                        let locale = accessor.effective_locale(pass.locale);
                        if let Err(error) = generator.prepare(context, accessor, locale) {
                            pass.report(Some(accessor.name.as_str()), error);
                        }
                    }
                }
                Err(error) => pass.report(None, error),
            }
            generators.push(ActiveGenerator {
                id,
                generator,
                accessors: &task.accessors,
            });
        }
        generators
    }

    /// Create fields and assignments, then assemble the source of the type
    fn emit(
        &self,
        pass: &mut Pass<'_>,
        context: &mut ResourceContext<'_>,
        generators: &mut [ActiveGenerator<'_>],
        simple_name: &str,
    ) -> String {
        let bundle = pass.bundle;
        let mut fields = FieldRegistry::new();
        for active in generators.iter_mut() {
            context.set_current_generator(active.id);
            if let Err(error) = active.generator.create_fields(context, &mut fields) {
                pass.report(None, error);
            }
        }
        let slots: Vec<String> = bundle
            .accessors
            .iter()
            .map(|accessor| {
                fields.define(
                    &slot_type(&accessor.result_type),
                    &accessor.name,
                    None,
                    true,
                    true,
                )
            })
            .collect();

        let mut assignments: FxIndexMap<&str, (String, bool)> = FxIndexMap::default();
        for active in generators.iter_mut() {
            context.set_current_generator(active.id);
            let is_prototype = active.generator.produces_prototype();
            for accessor in active.accessors {
                let locale = accessor.effective_locale(pass.locale);
                match active.generator.create_assignment(context, accessor, locale) {
                    Ok(initializer) => {
                        assignments.insert(accessor.name.as_str(), (initializer, is_prototype));
                    }
                    Err(error) => pass.report(Some(accessor.name.as_str()), error),
                }
            }
        }

        let accessors = bundle
            .accessors
            .iter()
            .zip(slots)
            .filter_map(|(accessor, slot)| {
                assignments
                    .swap_remove(accessor.name.as_str())
                    .map(|(initializer, is_prototype)| AccessorCode {
                        accessor,
                        slot,
                        initializer,
                        is_prototype,
                    })
            })
            .collect();
        let supertraits = all_parents(self.hierarchy, &bundle.name)
            .into_iter()
            .flatten()
            .filter(|parent| self.bundles.contains_key(parent))
            .collect();
        TypeAssembly {
            bundle,
            simple_name,
            locale: pass.locale,
            supertraits,
            fields: &fields,
            accessors,
        }
        .assemble()
    }
}
