//! Collision-free field allocation for one generated type

use crate::{
    naming::{to_screaming_snake_case, to_snake_case},
    types::{FxIndexMap, FxIndexSet},
};

/// Identifier of the shared instance every generated type declares
pub const INSTANCE_IDENT: &str = "_INSTANCE0";

/// Identifier of the lazily built name lookup table
pub const RESOURCE_MAP_IDENT: &str = "RESOURCE_MAP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub ident: String,
    /// Rust type of the field's value
    pub ty: String,
    pub initializer: Option<String>,
    pub is_static: bool,
    pub is_final: bool,
}

/// Issues unique field identifiers and remembers definitions in order.
///
/// Later initializers may refer to earlier fields, so entries are emitted in
/// the order they were defined.
#[derive(Debug)]
pub struct FieldRegistry {
    fields: FxIndexMap<String, FieldEntry>,
    used: FxIndexSet<String>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            fields: FxIndexMap::default(),
            used: FxIndexSet::default(),
        };
        registry.reserve(INSTANCE_IDENT);
        registry.reserve(RESOURCE_MAP_IDENT);
        registry
    }

    /// Define a field and return the identifier to reference it by.
    ///
    /// Static fields are named in SCREAMING_SNAKE_CASE and instance fields in
    /// snake_case; a taken name gets a `_0`, `_1`, ... suffix.
    pub fn define(
        &mut self,
        ty: &str,
        name: &str,
        initializer: Option<&str>,
        is_static: bool,
        is_final: bool,
    ) -> String {
        let base = if is_static {
            to_screaming_snake_case(name)
        } else {
            to_snake_case(name)
        };
        let ident = self.create_name(&base);
        self.fields.insert(
            ident.clone(),
            FieldEntry {
                ident: ident.clone(),
                ty: ty.to_owned(),
                initializer: initializer.map(str::to_owned),
                is_static,
                is_final,
            },
        );
        ident
    }

    /// Reserve a name so that no field is ever given it
    fn reserve(&mut self, ident: &str) {
        self.used.insert(ident.to_owned());
    }

    pub fn get(&self, ident: &str) -> Option<&FieldEntry> {
        self.fields.get(ident)
    }

    /// All fields in definition order
    pub fn iter(&self) -> impl Iterator<Item = &FieldEntry> {
        self.fields.values()
    }

    pub fn statics(&self) -> impl Iterator<Item = &FieldEntry> {
        self.iter().filter(|field| field.is_static)
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldEntry> {
        self.iter().filter(|field| !field.is_static)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn create_name(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "field" } else { base };
        if self.used.insert(base.to_owned()) {
            return base.to_owned();
        }
        let mut index = 0_usize;
        loop {
            let candidate = format!("{base}_{index}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_colliding_names_are_made_unique_in_order() {
        let mut fields = FieldRegistry::new();
        let idents: Vec<String> = (0..4)
            .map(|i| {
                fields.define(
                    "String",
                    "externalImage",
                    Some(format!("String::from(\"{i}\")").as_str()),
                    true,
                    true,
                )
            })
            .collect();

        assert_eq!(
            idents,
            vec![
                "EXTERNAL_IMAGE",
                "EXTERNAL_IMAGE_0",
                "EXTERNAL_IMAGE_1",
                "EXTERNAL_IMAGE_2"
            ]
        );
        let initializers: Vec<_> = fields
            .iter()
            .map(|field| field.initializer.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(
            initializers,
            vec![
                "String::from(\"0\")",
                "String::from(\"1\")",
                "String::from(\"2\")",
                "String::from(\"3\")"
            ]
        );
    }

    #[test]
    fn test_reserved_names_are_never_issued() {
        let mut fields = FieldRegistry::new();
        assert_eq!(fields.define("u32", "resourceMap", None, true, false), "RESOURCE_MAP_0");

        fields.reserve("LOGO");
        assert_eq!(fields.define("u32", "logo", None, true, false), "LOGO_0");
    }

    #[test]
    fn test_instance_and_static_partitions() {
        let mut fields = FieldRegistry::new();
        fields.define("u32", "hits", None, false, false);
        fields.define("String", "url", Some("String::new()"), true, true);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.instance_fields().map(|f| f.ident.as_str()).collect::<Vec<_>>(), vec!["hits"]);
        assert_eq!(fields.statics().map(|f| f.ident.as_str()).collect::<Vec<_>>(), vec!["URL"]);
        assert!(fields.get("URL").is_some_and(|field| field.is_final));
    }
}
