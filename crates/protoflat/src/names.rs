//! Identifier transforms for parameters and builder setters.

/// Fold `snake_case` words into `lowerCamelCase` (`display_name` → `displayName`).
///
/// Deterministic and lossy: `a_b` and `a__b` both become `aB`, so two paths
/// whose final segments fold to the same name produce colliding parameters.
#[must_use]
pub fn lower_camel(s: &str) -> String {
    let upper = upper_camel(s);
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fold `snake_case` words into `UpperCamelCase` (`display_name` → `DisplayName`).
#[must_use]
pub fn upper_camel(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for word in s.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars.flat_map(char::to_lowercase));
        }
    }
    result
}

/// Parameter name derived from a field name.
#[must_use]
pub fn parameter_name(field: &str) -> String {
    lower_camel(field)
}
