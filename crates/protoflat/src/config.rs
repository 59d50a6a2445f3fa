//! Flattening configuration loaded from YAML.
//!
//! Keeps per-method flattening groups and paging settings next to the proto
//! files instead of hardcoding them in build scripts.
//!
//! # File format
//!
//! ```yaml
//! # Suffix pair for long-running payload types (both default as shown).
//! lro:
//!   request_suffix: Request
//!   response_suffix: Response
//!
//! services:
//!   google.example.HelloService:
//!     methods:
//!       HiThere:
//!         # Each group becomes one flattened method overload.
//!         flattening:
//!           - parameters: [query]
//!           - parameters: [query, detail.inner.note, "tags[0]"]
//!         # Repeated response field holding one page of items.
//!         paging:
//!           response_list: results
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::response::LroConvention;
use crate::schema::normalize;

/// Project-level flattening config.
///
/// Loaded from a YAML file via [`FlattenConfig::load`] or from a string via
/// [`FlattenConfig::parse`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// Long-running naming convention override.
    pub lro: LroConfig,

    /// Fully-qualified service name → per-service settings.
    pub services: HashMap<String, ServiceConfig>,
}

/// Settings for one service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Proto method name (e.g. `HiThere`) → per-method settings.
    pub methods: HashMap<String, MethodConfig>,
}

/// Settings for one method.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MethodConfig {
    /// Flattening groups, each producing one parameter list.
    pub flattening: Vec<FlatteningGroup>,

    /// Paged response settings; absent for unpaged methods.
    pub paging: Option<PagingConfig>,
}

/// One ordered list of flatten paths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatteningGroup {
    /// Dotted field paths, each segment optionally suffixed `[0]`.
    pub parameters: Vec<String>,
}

/// Paged response designation.
#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    /// Path of the repeated response field holding the page's items.
    pub response_list: String,
}

/// Suffix overrides for [`LroConvention`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LroConfig {
    /// Request type suffix (default `Request`).
    pub request_suffix: Option<String>,
    /// Response type suffix (default `Response`).
    pub response_suffix: Option<String>,
}

impl FlattenConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`](crate::Error::Yaml) on malformed input.
    pub fn parse(yaml: &str) -> crate::error::Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        Ok(config)
    }

    /// Settings for `method` of `service`, if configured.
    ///
    /// The service name may carry protoc's leading dot.
    #[must_use]
    pub fn method(&self, service: &str, method: &str) -> Option<&MethodConfig> {
        self.services.get(normalize(service))?.methods.get(method)
    }

    /// The configured long-running naming convention.
    #[must_use]
    pub fn lro_convention(&self) -> LroConvention {
        let mut convention = LroConvention::new();
        if let Some(suffix) = &self.lro.request_suffix {
            convention = convention.request_suffix(suffix.clone());
        }
        if let Some(suffix) = &self.lro.response_suffix {
            convention = convention.response_suffix(suffix.clone());
        }
        convention
    }
}
