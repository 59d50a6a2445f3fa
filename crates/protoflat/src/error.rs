//! Typed error enum for the `protoflat` library API.
//!
//! Every resolver in this crate either returns a value or fails with exactly
//! one of these variants. Nothing is retried or swallowed here: all of them
//! describe a schema or configuration defect, and the caller decides whether
//! a failure aborts the run or only skips one method.

/// Errors produced by `protoflat` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A referenced type name is absent from the schema index.
    #[error("unknown type '{type_name}'")]
    UnknownType {
        /// The unresolved type name, as written by the caller.
        type_name: String,
    },

    /// A path segment carries a literal index other than `[0]`, or more
    /// than one segment of the path is indexed.
    #[error("unsupported index [{index}] in field path '{path}': only a single [0] is supported")]
    UnsupportedIndex {
        /// The full dotted path.
        path: String,
        /// The offending index literal.
        index: String,
    },

    /// A named path segment does not exist in the current message.
    #[error("field '{field}' not found in message '{message}'")]
    FieldNotFound {
        /// Fully-qualified name of the message that was searched.
        message: String,
        /// The missing field name.
        field: String,
    },

    /// The path continues past a field that is not a message.
    #[error("field '{field}' in '{path}' cannot be traversed: {reason}")]
    NonTraversableType {
        /// The full dotted path.
        path: String,
        /// The field the path tried to descend through.
        field: String,
        /// What kind of field stopped traversal.
        reason: String,
    },

    /// A field's wire kind has no entry in the scalar mapping table.
    #[error("field '{field}' has unmappable wire type {type_id}")]
    UnmappableType {
        /// Name of the field.
        field: String,
        /// Raw `FieldDescriptorProto.Type` value.
        type_id: i32,
    },

    /// A paging path resolved to a field that is not a list.
    #[error("paged response field '{path}' on '{message}' is not a repeated field")]
    NotAListField {
        /// Fully-qualified response message name.
        message: String,
        /// The configured list field path.
        path: String,
    },

    /// The long-running-operation naming convention was violated, or the
    /// substituted response type does not exist.
    #[error("cannot derive long-running response type from '{type_name}': {reason}")]
    NamingConvention {
        /// The request type name the convention was applied to.
        type_name: String,
        /// Which half of the convention failed.
        reason: String,
    },

    /// Proto `FileDescriptorSet` / `CodeGeneratorRequest` decoding failure.
    #[error("failed to decode proto descriptor: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// File I/O failure while reading a project config.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing failure while reading a project config.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn unknown_type(type_name: &str) -> Self {
        Self::UnknownType {
            type_name: type_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time assertion that `Error` is `Send + Sync`.
    /// Required so orchestrators can fan methods out across threads.
    const _: () = {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    };

    #[test]
    fn messages_name_the_offending_input() {
        let err = Error::UnsupportedIndex {
            path: "tags[1]".to_string(),
            index: "1".to_string(),
        };
        assert!(err.to_string().contains("tags[1]"));
        assert!(err.to_string().contains("[1]"));

        let err = Error::FieldNotFound {
            message: "google.example.HiRequest".to_string(),
            field: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "field 'nope' not found in message 'google.example.HiRequest'"
        );
    }
}
