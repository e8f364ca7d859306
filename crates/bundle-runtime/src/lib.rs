//! Runtime types for generated resource bundles
//!
//! Code produced by `resource-bundler` implements a user-declared bundle trait
//! and hands out `&'static` references to the values defined here. Every trait
//! is `Send + Sync` so that generated code can keep resources in `static`
//! slots that are initialized at most once.

use std::fmt;

/// Common behavior of every generated resource.
pub trait ResourcePrototype: Send + Sync {
    /// The name of the accessor that produced this resource.
    fn name(&self) -> &str;
}

/// A resource whose contents are embedded as text.
pub trait TextResource: ResourcePrototype {
    fn text(&self) -> &str;
}

/// A resource addressed through a URL, either a `data:` URL or a deployed file.
pub trait DataResource: ResourcePrototype {
    fn url(&self) -> &str;
}

/// An image resource with its final display geometry.
pub trait ImageResource: ResourcePrototype {
    fn url(&self) -> &str;
    fn left(&self) -> u32;
    fn top(&self) -> u32;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn is_animated(&self) -> bool;
    fn is_lossy(&self) -> bool;
}

/// Implemented by every generated bundle.
///
/// `resources` returns the bundle's own resources in declaration order; nested
/// bundles are not part of it. `resource` looks a resource up by accessor name.
pub trait ClientBundle: Send + Sync {
    fn resources(&self) -> Vec<&'static dyn ResourcePrototype>;

    fn resource(&self, name: &str) -> Option<&'static dyn ResourcePrototype>;
}

/// Text resource value constructed by generated initializers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResourcePrototype {
    name: String,
    text: String,
}

impl TextResourcePrototype {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl ResourcePrototype for TextResourcePrototype {
    fn name(&self) -> &str {
        &self.name
    }
}

impl TextResource for TextResourcePrototype {
    fn text(&self) -> &str {
        &self.text
    }
}

/// Data resource value constructed by generated initializers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataResourcePrototype {
    name: String,
    url: String,
}

impl DataResourcePrototype {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl ResourcePrototype for DataResourcePrototype {
    fn name(&self) -> &str {
        &self.name
    }
}

impl DataResource for DataResourcePrototype {
    fn url(&self) -> &str {
        &self.url
    }
}

/// Image resource value constructed by generated initializers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResourcePrototype {
    name: String,
    url: String,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    animated: bool,
    lossy: bool,
}

impl ImageResourcePrototype {
    /// Only called by generated code.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        animated: bool,
        lossy: bool,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            left,
            top,
            width,
            height,
            animated,
            lossy,
        }
    }
}

impl ResourcePrototype for ImageResourcePrototype {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ImageResource for ImageResourcePrototype {
    fn url(&self) -> &str {
        &self.url
    }

    fn left(&self) -> u32 {
        self.left
    }

    fn top(&self) -> u32 {
        self.top
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_animated(&self) -> bool {
        self.animated
    }

    fn is_lossy(&self) -> bool {
        self.lossy
    }
}

impl fmt::Display for ImageResourcePrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}
