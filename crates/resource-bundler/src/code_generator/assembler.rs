//! Assembly of the implementation type generated for one bundle
//!
//! The output is a private module holding the implementation, its statics and
//! one holder type per accessor, re-exported under the generated simple name:
//!
//! - the accessor value lives in a `OnceLock` slot,
//! - `<name>_initializer` fills the slot exactly once,
//! - `<Name>Initializer::get` triggers that initializer on first access,
//! - the bundle trait method returns the holder's value.

use crate::{
    code_generator::writer::SourceWriter,
    fields::{FieldEntry, FieldRegistry, INSTANCE_IDENT, RESOURCE_MAP_IDENT},
    model::{DeclaredAccessor, DeclaredBundle, TypeName, builtin},
    naming::{to_snake_case, to_upper_camel_case},
    types::{FxIndexMap, FxIndexSet},
};

const LINTS: &str = "#![allow(dead_code, missing_debug_implementations, non_camel_case_types, \
                     non_snake_case, non_upper_case_globals, trivial_casts, unused_qualifications, \
                     clippy::all, clippy::pedantic, clippy::nursery, clippy::restriction)]";

/// Code produced for one accessor during the emitting phase
#[derive(Debug)]
pub struct AccessorCode<'a> {
    pub accessor: &'a DeclaredAccessor,
    /// Identifier of the accessor's value slot in the field registry
    pub slot: String,
    /// Expression producing the accessor's value
    pub initializer: String,
    /// Listed by `resources()` and `resource(name)`
    pub is_prototype: bool,
}

/// Everything needed to emit one generated type
#[derive(Debug)]
pub struct TypeAssembly<'a> {
    pub bundle: &'a DeclaredBundle,
    pub simple_name: &'a str,
    pub locale: Option<&'a str>,
    /// Bundle traits to implement besides the bundle itself, e.g. inherited ones
    pub supertraits: Vec<TypeName>,
    pub fields: &'a FieldRegistry,
    pub accessors: Vec<AccessorCode<'a>>,
}

/// Path usable from inside the generated private module
fn qualified(ty: &TypeName) -> String {
    let path = ty.as_str();
    if path.starts_with("::") || path.starts_with("crate::") {
        path.to_owned()
    } else if let Some(rest) = path.strip_prefix("self::") {
        format!("super::{rest}")
    } else {
        format!("super::{path}")
    }
}

/// Type of the slot holding an accessor's value
pub fn slot_type(result_type: &TypeName) -> String {
    format!(
        "::std::boxed::Box<dyn {} + Send + Sync>",
        qualified(result_type)
    )
}

fn prototype_ref() -> String {
    format!("&'static dyn {}", builtin::RESOURCE_PROTOTYPE)
}

/// Separate the `//` lines a generator put in front of its expression
fn split_leading_comments(initializer: &str) -> (Vec<&str>, &str) {
    let mut comments = Vec::new();
    let mut rest = initializer;
    while rest.starts_with("//") {
        match rest.split_once('\n') {
            Some((comment, tail)) => {
                comments.push(comment);
                rest = tail;
            }
            None => break,
        }
    }
    (comments, rest)
}

impl TypeAssembly<'_> {
    /// Render the complete generated source file
    pub fn assemble(&self) -> String {
        let holders = self.holder_names();
        let mut w = SourceWriter::new();
        match self.locale {
            Some(locale) => w.line(&format!(
                "// Generated by resource-bundler from {} for locale {locale}. Do not edit.",
                self.bundle.name
            )),
            None => w.line(&format!(
                "// Generated by resource-bundler from {}. Do not edit.",
                self.bundle.name
            )),
        };
        w.blank();
        let module = format!("__{}", to_snake_case(self.simple_name));
        w.line(&format!("pub use self::{module}::{};", self.simple_name));
        w.blank();
        w.block(&format!("mod {module}"), "", |w| {
            w.line(LINTS);
            w.blank();
            self.write_statics(w);
            self.write_struct(w);
            self.write_holders(w, &holders);
            self.write_trait_impls(w, &holders);
            self.write_client_bundle(w, &holders);
        });
        w.finish()
    }

    /// `<Name>Initializer` per accessor, unique within the type
    fn holder_names(&self) -> Vec<String> {
        let mut used = FxIndexSet::default();
        used.insert(self.simple_name.to_owned());
        self.accessors
            .iter()
            .map(|code| {
                let base = format!("{}Initializer", to_upper_camel_case(&code.accessor.name));
                let mut name = base.clone();
                let mut index = 0_usize;
                while !used.insert(name.clone()) {
                    name = format!("{base}{index}");
                    index += 1;
                }
                name
            })
            .collect()
    }

    fn write_statics(&self, w: &mut SourceWriter) {
        w.line(&format!(
            "static {INSTANCE_IDENT}: {name} = {name}::new();",
            name = self.simple_name
        ));
        w.blank();
        w.line(&format!(
            "static {RESOURCE_MAP_IDENT}: ::std::sync::OnceLock<::std::collections::HashMap<&'static \
             str, {}>> = ::std::sync::OnceLock::new();",
            prototype_ref()
        ));
        w.blank();
        for field in self.fields.statics() {
            match &field.initializer {
                Some(initializer) => w.line(&format!(
                    "static {}: ::std::sync::LazyLock<{}> = ::std::sync::LazyLock::new(|| {initializer});",
                    field.ident, field.ty
                )),
                None => w.line(&format!(
                    "static {}: ::std::sync::OnceLock<{}> = ::std::sync::OnceLock::new();",
                    field.ident, field.ty
                )),
            };
            w.blank();
        }
    }

    fn write_struct(&self, w: &mut SourceWriter) {
        let instance_fields: Vec<&FieldEntry> = self.fields.instance_fields().collect();
        if instance_fields.is_empty() {
            w.line(&format!("pub struct {} {{}}", self.simple_name));
        } else {
            w.block(&format!("pub struct {}", self.simple_name), "", |w| {
                for field in &instance_fields {
                    match field.initializer {
                        Some(_) => w.line(&format!("{}: {},", field.ident, field.ty)),
                        None => w.line(&format!(
                            "{}: ::std::sync::OnceLock<{}>,",
                            field.ident, field.ty
                        )),
                    };
                }
            });
        }
        w.blank();

        w.block(&format!("impl {}", self.simple_name), "", |w| {
            if instance_fields.is_empty() {
                w.block("pub const fn new() -> Self", "", |w| {
                    w.line("Self {}");
                });
            } else {
                w.block("pub const fn new() -> Self", "", |w| {
                    w.block("Self", "", |w| {
                        for field in &instance_fields {
                            match &field.initializer {
                                Some(initializer) => {
                                    w.line(&format!("{}: {initializer},", field.ident))
                                }
                                None => w.line(&format!(
                                    "{}: ::std::sync::OnceLock::new(),",
                                    field.ident
                                )),
                            };
                        }
                    });
                });
            }
            for code in &self.accessors {
                w.blank();
                self.write_initializer_method(w, code);
            }
        });
        w.blank();
    }

    fn write_initializer_method(&self, w: &mut SourceWriter, code: &AccessorCode<'_>) {
        let result = qualified(&code.accessor.result_type);
        let (comments, expression) = split_leading_comments(&code.initializer);
        w.block(
            &format!(
                "fn {}_initializer(&self) -> &'static dyn {result}",
                code.accessor.name
            ),
            "",
            |w| {
                w.block(
                    &format!(
                        "&**{}.get_or_init(|| -> {}",
                        code.slot,
                        slot_type(&code.accessor.result_type)
                    ),
                    ")",
                    |w| {
                        for comment in comments {
                            w.line(comment);
                        }
                        w.line(&format!("::std::boxed::Box::new({expression})"));
                    },
                );
            },
        );
    }

    fn write_holders(&self, w: &mut SourceWriter, holders: &[String]) {
        for (code, holder) in self.accessors.iter().zip(holders) {
            let result = qualified(&code.accessor.result_type);
            w.line(&format!("struct {holder};"));
            w.blank();
            w.block(&format!("impl {holder}"), "", |w| {
                w.block(&format!("fn get() -> &'static dyn {result}"), "", |w| {
                    w.line(&format!("{INSTANCE_IDENT}.{}_initializer()", code.accessor.name));
                });
            });
            w.blank();
        }
    }

    /// One impl per bundle trait, with the accessors that trait declares
    fn write_trait_impls(&self, w: &mut SourceWriter, holders: &[String]) {
        let mut owners: FxIndexMap<&TypeName, Vec<(&AccessorCode<'_>, &String)>> =
            FxIndexMap::default();
        owners.insert(&self.bundle.name, Vec::new());
        for supertrait in &self.supertraits {
            owners.entry(supertrait).or_default();
        }
        for (code, holder) in self.accessors.iter().zip(holders) {
            let owner = code.accessor.owner.as_ref().unwrap_or(&self.bundle.name);
            owners.entry(owner).or_default().push((code, holder));
        }

        for (owner, members) in owners {
            let header = format!("impl {} for {}", qualified(owner), self.simple_name);
            if members.is_empty() {
                w.line(&format!("{header} {{}}"));
            } else {
                w.block(&header, "", |w| {
                    for (index, (code, holder)) in members.iter().enumerate() {
                        if index > 0 {
                            w.blank();
                        }
                        w.block(
                            &format!(
                                "fn {}(&self) -> &'static dyn {}",
                                code.accessor.name,
                                qualified(&code.accessor.result_type)
                            ),
                            "",
                            |w| {
                                w.line(&format!("{holder}::get()"));
                            },
                        );
                    }
                });
            }
            w.blank();
        }
    }

    fn write_client_bundle(&self, w: &mut SourceWriter, holders: &[String]) {
        let prototype = prototype_ref();
        let listed: Vec<(&AccessorCode<'_>, &String)> = self
            .accessors
            .iter()
            .zip(holders)
            .filter(|(code, _)| code.is_prototype)
            .collect();

        let header = format!("impl {} for {}", builtin::CLIENT_BUNDLE, self.simple_name);
        w.block(&header, "", |w| {
            w.block(
                &format!("fn resources(&self) -> ::std::vec::Vec<{prototype}>"),
                "",
                |w| {
                    if listed.is_empty() {
                        w.line("::std::vec::Vec::new()");
                    } else {
                        w.line("::std::vec![");
                        w.indent();
                        for (_, holder) in &listed {
                            w.line(&format!("{holder}::get() as {prototype},"));
                        }
                        w.outdent();
                        w.line("]");
                    }
                },
            );
            w.blank();
            w.block(
                &format!(
                    "fn resource(&self, name: &str) -> ::std::option::Option<{prototype}>"
                ),
                "",
                |w| {
                    w.line(RESOURCE_MAP_IDENT);
                    w.indent();
                    w.block(".get_or_init(||", ")", |w| {
                        w.line("::std::collections::HashMap::from([");
                        w.indent();
                        for (code, holder) in &listed {
                            w.line(&format!(
                                "(\"{}\", {holder}::get() as {prototype}),",
                                code.accessor.name
                            ));
                        }
                        w.outdent();
                        w.line("])");
                    });
                    w.line(".get(name)");
                    w.line(".copied()");
                    w.outdent();
                },
            );
        });
    }
}
