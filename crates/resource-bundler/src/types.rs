//! Type aliases shared across the crate

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;

/// Insertion-ordered map using the Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Insertion-ordered set using the Fx hasher
pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;
