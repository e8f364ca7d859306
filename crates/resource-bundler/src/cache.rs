//! Per-pass store for state shared between accessors of one generator

use std::{any::Any, fmt, rc::Rc};

use crate::{dispatch::GeneratorId, types::FxIndexMap};

/// Typed key-value store namespaced by generator.
///
/// Created for each generation pass and dropped when the pass ends, so two
/// bundles never observe each other's entries. A lookup with the wrong value
/// type behaves like a miss.
#[derive(Default)]
pub struct SharedCache {
    entries: FxIndexMap<(GeneratorId, String), Rc<dyn Any>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get<T: Any>(&self, generator: GeneratorId, key: &str) -> Option<Rc<T>> {
        self.entries
            .get(&(generator, key.to_owned()))
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    fn put<T: Any>(&mut self, generator: GeneratorId, key: impl Into<String>, value: Rc<T>) {
        self.entries.insert((generator, key.into()), value);
    }

    /// Return the cached value, computing and storing it on a miss
    pub fn get_or_insert_with<T: Any>(
        &mut self,
        generator: GeneratorId,
        key: &str,
        create: impl FnOnce() -> T,
    ) -> Rc<T> {
        if let Some(existing) = self.get::<T>(generator, key) {
            return existing;
        }
        let value = Rc::new(create());
        self.put(generator, key, Rc::clone(&value));
        value
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                self.entries
                    .keys()
                    .map(|(generator, key)| format!("{generator}:{key}")),
            )
            .finish()
    }
}
