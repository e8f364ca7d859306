//! Bundle traits whose implementations `build.rs` generates from
//! `bundles.toml`. The integration tests call into the generated code.

use bundle_runtime::{ClientBundle, DataResource, ImageResource, TextResource};

pub trait Messages: ClientBundle {
    fn greeting(&self) -> &'static dyn TextResource;
    fn blob(&self) -> &'static dyn DataResource;
    /// Same bytes as `blob` with a MIME type that needs escaping
    fn quoted(&self) -> &'static dyn DataResource;
    fn logo(&self) -> &'static dyn ImageResource;
    fn footer(&self) -> &'static dyn Footer;
}

pub trait Footer: ClientBundle {
    fn notice(&self) -> &'static dyn TextResource;
}

pub trait Base: ClientBundle {
    fn greeting(&self) -> &'static dyn TextResource;
    fn farewell(&self) -> &'static dyn TextResource;
}

/// Overrides `farewell` with another source
pub trait Derived: Base {
    fn notice(&self) -> &'static dyn TextResource;
}

include!(concat!(env!("OUT_DIR"), "/messages_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/messages_fr_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/footer_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/footer_fr_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/base_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/base_fr_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/derived_impl.rs"));
include!(concat!(env!("OUT_DIR"), "/derived_fr_impl.rs"));
