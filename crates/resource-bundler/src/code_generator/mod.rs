//! Emission of generated Rust sources
//!
//! Generators produce initializer expressions as text; this module escapes
//! and chunks literals, tracks indentation and assembles the final
//! implementation type of a bundle.

pub mod assembler;
pub mod literal;
pub mod writer;

pub use assembler::{AccessorCode, TypeAssembly, slot_type};
