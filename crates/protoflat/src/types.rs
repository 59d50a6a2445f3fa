//! Field → parameter type classification.
//!
//! The mapping from wire kinds to parameter types is a fixed table: every
//! 32-bit integer encoding collapses to [`ScalarType::Int32`], every 64-bit
//! one to [`ScalarType::Int64`], `bytes` becomes an opaque byte sequence, and
//! enum/message references keep their schema name.

use std::fmt;

use crate::error::{Error, Result};
use crate::schema::{FieldKind, FieldSchema, PrimitiveKind, SchemaIndex};

/// Language-level scalar parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarType {
    String,
    Bool,
    Float,
    Double,
    Int32,
    Int64,
}

/// The inferred type of a flattened parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A plain scalar.
    Scalar(ScalarType),
    /// Opaque byte sequence (`bytes`).
    Bytes,
    /// An enum, by fully-qualified name.
    Enum(String),
    /// A message, by fully-qualified name.
    Message(String),
    /// A repeated, non-map field.
    List(Box<ParamType>),
    /// A `map<K, V>` field.
    Map(Box<ParamType>, Box<ParamType>),
}

impl ParamType {
    /// Element type of a [`List`](Self::List).
    #[must_use]
    pub fn list_element(&self) -> Option<&ParamType> {
        match self {
            Self::List(element) => Some(element),
            _ => None,
        }
    }

    /// Whether this is a [`Map`](Self::Map).
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(..))
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Double => "double",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        })
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => s.fmt(f),
            Self::Bytes => f.write_str("bytes"),
            Self::Enum(name) | Self::Message(name) => f.write_str(name),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
        }
    }
}

/// Fixed wire-kind table for non-reference fields.
#[must_use]
pub fn scalar_type(kind: PrimitiveKind) -> ParamType {
    use PrimitiveKind as P;

    match kind {
        P::String => ParamType::Scalar(ScalarType::String),
        P::Bool => ParamType::Scalar(ScalarType::Bool),
        P::Float => ParamType::Scalar(ScalarType::Float),
        P::Double => ParamType::Scalar(ScalarType::Double),
        P::Int32 | P::Uint32 | P::Sint32 | P::Fixed32 | P::Sfixed32 => {
            ParamType::Scalar(ScalarType::Int32)
        }
        P::Int64 | P::Uint64 | P::Sint64 | P::Fixed64 | P::Sfixed64 => {
            ParamType::Scalar(ScalarType::Int64)
        }
        P::Bytes => ParamType::Bytes,
    }
}

/// Classify a field as scalar, list, map, enum or message.
///
/// A field is a map iff it references a map-entry message; it is a list iff
/// it is repeated and not a map.
///
/// # Errors
///
/// - [`Error::UnmappableType`] for wire kinds outside the table (e.g. groups)
/// - [`Error::UnknownType`] if a referenced message or enum is not indexed
/// - [`Error::FieldNotFound`] if a map entry lacks its `key` or `value` field
pub fn classify(index: &SchemaIndex, field: &FieldSchema) -> Result<ParamType> {
    if field.map_entry {
        let entry_name = field.message_type().unwrap_or_default();
        let entry = index.message(entry_name)?;
        let part = |name: &str| {
            entry
                .field(name)
                .map(|(_, f)| f)
                .ok_or_else(|| Error::FieldNotFound {
                    message: entry.name.clone(),
                    field: name.to_string(),
                })
        };
        let key = element_type(index, part("key")?)?;
        let value = element_type(index, part("value")?)?;
        return Ok(ParamType::Map(Box::new(key), Box::new(value)));
    }

    let element = element_type(index, field)?;
    Ok(if field.repeated {
        ParamType::List(Box::new(element))
    } else {
        element
    })
}

/// The type of a single value of `field`, ignoring `repeated`.
///
/// # Errors
///
/// Same as [`classify`], minus the map-entry case.
pub fn element_type(index: &SchemaIndex, field: &FieldSchema) -> Result<ParamType> {
    match &field.kind {
        FieldKind::Primitive(kind) => Ok(scalar_type(*kind)),
        FieldKind::Enum(name) => {
            index.lookup(name)?;
            Ok(ParamType::Enum(name.clone()))
        }
        FieldKind::Message(name) => {
            index.message(name)?;
            Ok(ParamType::Message(name.clone()))
        }
        FieldKind::Unsupported(type_id) => Err(Error::UnmappableType {
            field: field.name.clone(),
            type_id: *type_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use prost_types::field_descriptor_proto::Type;

    use super::*;
    use crate::path::resolve_str;
    use crate::schema::tests::{hello_index, make_file, make_map_entry, make_message};

    fn classify_path(index: &SchemaIndex, path: &str) -> Result<ParamType> {
        let root = index.message("google.example.HiRequest")?;
        classify(index, resolve_str(index, root, path)?.field)
    }

    fn string() -> ParamType {
        ParamType::Scalar(ScalarType::String)
    }

    #[test]
    fn scalar_table() {
        use PrimitiveKind as P;

        for kind in [P::Int32, P::Uint32, P::Sint32, P::Fixed32, P::Sfixed32] {
            assert_eq!(scalar_type(kind), ParamType::Scalar(ScalarType::Int32), "{kind:?}");
        }
        for kind in [P::Int64, P::Uint64, P::Sint64, P::Fixed64, P::Sfixed64] {
            assert_eq!(scalar_type(kind), ParamType::Scalar(ScalarType::Int64), "{kind:?}");
        }
        assert_eq!(scalar_type(P::Float), ParamType::Scalar(ScalarType::Float));
        assert_eq!(scalar_type(P::Double), ParamType::Scalar(ScalarType::Double));
        assert_eq!(scalar_type(P::Bool), ParamType::Scalar(ScalarType::Bool));
        assert_eq!(scalar_type(P::String), string());
        assert_eq!(scalar_type(P::Bytes), ParamType::Bytes);
    }

    #[test]
    fn classify_shapes() {
        let index = hello_index();
        assert_eq!(classify_path(&index, "query").unwrap(), string());
        assert_eq!(
            classify_path(&index, "tags").unwrap(),
            ParamType::List(Box::new(string()))
        );
        assert_eq!(
            classify_path(&index, "flags").unwrap(),
            ParamType::Map(Box::new(string()), Box::new(string()))
        );
        assert_eq!(
            classify_path(&index, "mood").unwrap(),
            ParamType::Enum("google.example.Mood".to_string())
        );
        assert_eq!(
            classify_path(&index, "detail").unwrap(),
            ParamType::Message("google.example.Detail".to_string())
        );
        assert_eq!(
            classify_path(&index, "history").unwrap(),
            ParamType::List(Box::new(ParamType::Message(
                "google.example.Detail".to_string()
            )))
        );
        assert_eq!(classify_path(&index, "detail.blob").unwrap(), ParamType::Bytes);
    }

    #[test]
    fn nested_map_with_message_values() {
        let index = hello_index();
        let ty = classify_path(&index, "detail.children").unwrap();
        assert!(ty.is_map());
        assert_eq!(ty.to_string(), "map<int32, google.example.Detail>");
    }

    #[test]
    fn group_fields_are_unmappable() {
        let index = SchemaIndex::build(&[make_file(
            "legacy.proto",
            "pkg",
            vec![make_message("Old", &[("grp", Type::Group, None, false)])],
        )]);
        let old = index.message("pkg.Old").unwrap();
        let err = classify(&index, &old.fields[0]).unwrap_err();
        assert!(
            matches!(err, Error::UnmappableType { type_id: 10, ref field } if field == "grp"),
            "got {err:?}"
        );
    }

    #[test]
    fn map_entry_without_value_fails() {
        let mut broken = make_map_entry("BadEntry", Type::String, (Type::String, None));
        broken.field.retain(|f| f.name.as_deref() == Some("key"));
        let mut holder = make_message(
            "Holder",
            &[("bad", Type::Message, Some(".pkg.Holder.BadEntry"), true)],
        );
        holder.nested_type.push(broken);
        let index = SchemaIndex::build(&[make_file("bad.proto", "pkg", vec![holder])]);

        let holder = index.message("pkg.Holder").unwrap();
        let err = classify(&index, &holder.fields[0]).unwrap_err();
        assert!(
            matches!(&err, Error::FieldNotFound { message, field } if message == "pkg.Holder.BadEntry" && field == "value"),
            "got {err:?}"
        );
    }

    #[test]
    fn unknown_reference_fails() {
        let index = SchemaIndex::build(&[make_file(
            "dangling.proto",
            "pkg",
            vec![make_message(
                "Req",
                &[("ghost", Type::Enum, Some(".other.Ghost"), false)],
            )],
        )]);
        let req = index.message("pkg.Req").unwrap();
        assert!(matches!(
            classify(&index, &req.fields[0]),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn display_forms() {
        assert_eq!(ParamType::List(Box::new(ParamType::Bytes)).to_string(), "list<bytes>");
        assert_eq!(
            ParamType::Scalar(ScalarType::Int64).to_string(),
            "int64"
        );
        assert_eq!(
            ParamType::List(Box::new(string())).list_element(),
            Some(&string())
        );
        assert_eq!(string().list_element(), None);
    }
}
