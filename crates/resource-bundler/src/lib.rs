//! Build-time generator for resource bundles
//!
//! A declared bundle is a trait whose accessors each return a resource. The
//! engine finds the backing files, turns them into Rust initializer
//! expressions through pluggable generators and emits an implementation type
//! with lazily initialized accessors and a name based lookup table.

pub mod cache;
pub mod code_generator;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fields;
pub mod generators;
pub mod image_info;
pub mod manifest;
pub mod mime;
pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod resolver;
pub mod sink;
pub mod types;
