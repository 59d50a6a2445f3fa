//! Response shapes: paged list elements and long-running result types.

use crate::error::{Error, Result};
use crate::path::resolve_str;
use crate::schema::{normalize, MethodSchema, SchemaIndex};
use crate::types::{classify, ParamType};

/// Fully-qualified name of the generic long-running operation handle.
pub const LONG_RUNNING_OPERATION: &str = "google.longrunning.Operation";

/// Element type of the list designated as a paged response's items.
///
/// # Errors
///
/// - [`Error::UnknownType`] if `response_type` is not an indexed message
/// - any resolution error for `list_field_path`
/// - [`Error::NotAListField`] if the field is singular or a map
pub fn paged_element_type(
    index: &SchemaIndex,
    response_type: &str,
    list_field_path: &str,
) -> Result<ParamType> {
    let response = index.message(response_type)?;
    let resolved = resolve_str(index, response, list_field_path)?;
    match classify(index, resolved.field)? {
        ParamType::List(element) => Ok(*element),
        _ => Err(Error::NotAListField {
            message: response.name.clone(),
            path: list_field_path.to_string(),
        }),
    }
}

/// Whether `method` returns the generic long-running operation handle.
#[must_use]
pub fn is_long_running(method: &MethodSchema) -> bool {
    normalize(&method.output_type) == LONG_RUNNING_OPERATION
}

/// Suffix pair used to recover a long-running method's payload type.
///
/// `pkg.FooRequest` becomes `pkg.FooResponse` with the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LroConvention {
    request_suffix: String,
    response_suffix: String,
}

impl Default for LroConvention {
    fn default() -> Self {
        Self {
            request_suffix: "Request".to_string(),
            response_suffix: "Response".to_string(),
        }
    }
}

impl LroConvention {
    /// Create the default `Request` → `Response` convention.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suffix every long-running request type must end with.
    #[must_use]
    pub fn request_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.request_suffix = suffix.into();
        self
    }

    /// Suffix substituted in its place.
    #[must_use]
    pub fn response_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.response_suffix = suffix.into();
        self
    }

    /// Payload type for a long-running method, derived from its request type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamingConvention`] if the request type lacks the
    /// request suffix or the substituted name is not an indexed message.
    pub fn response_type<'a>(
        &self,
        index: &'a SchemaIndex,
        method: &MethodSchema,
    ) -> Result<&'a str> {
        self.response_type_for(index, &method.input_type)
    }

    /// Same as [`response_type`](Self::response_type), from a bare request type name.
    ///
    /// # Errors
    ///
    /// See [`response_type`](Self::response_type).
    pub fn response_type_for<'a>(&self, index: &'a SchemaIndex, request_type: &str) -> Result<&'a str> {
        let violation = |reason: String| Error::NamingConvention {
            type_name: request_type.to_string(),
            reason,
        };

        let stem = normalize(request_type)
            .strip_suffix(self.request_suffix.as_str())
            .ok_or_else(|| violation(format!("name does not end with '{}'", self.request_suffix)))?;
        let candidate = format!("{stem}{}", self.response_suffix);

        index
            .message(&candidate)
            .map(|m| m.name.as_str())
            .map_err(|_| violation(format!("'{candidate}' is not a known message")))
    }
}

/// [`LroConvention::response_type`] with the default suffixes.
///
/// # Errors
///
/// See [`LroConvention::response_type`].
pub fn long_running_response_type<'a>(
    index: &'a SchemaIndex,
    method: &MethodSchema,
) -> Result<&'a str> {
    LroConvention::default().response_type(index, method)
}
