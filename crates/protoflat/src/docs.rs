//! Leading-comment recovery from a file's source-location table.
//!
//! `protoc` records comments in `SourceCodeInfo` keyed by a path vector that
//! addresses the commented element: `[4, m, 2, f]` is field `f` of top-level
//! message `m`, `[6, s, 2, r]` is method `r` of service `s`. Lookups are a
//! linear scan; they run once per field or method.

use prost_types::SourceCodeInfo;

use crate::path::ResolvedField;
use crate::schema::{SchemaIndex, ServiceSchema};

/// Field tags used inside `SourceCodeInfo.location.path` vectors.
pub(crate) mod location_tag {
    /// `FileDescriptorProto.message_type`
    pub(crate) const FILE_MESSAGE_TYPE: i32 = 4;
    /// `FileDescriptorProto.service`
    pub(crate) const FILE_SERVICE: i32 = 6;
    /// `DescriptorProto.field`
    pub(crate) const MESSAGE_FIELD: i32 = 2;
    /// `DescriptorProto.nested_type`
    pub(crate) const MESSAGE_NESTED_TYPE: i32 = 3;
    /// `ServiceDescriptorProto.method`
    pub(crate) const SERVICE_METHOD: i32 = 2;
}

/// Flat `(path vector → leading comment)` table for one `.proto` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentTable {
    entries: Vec<(Vec<i32>, String)>,
}

impl CommentTable {
    /// Keep every location that carries a leading comment.
    #[must_use]
    pub fn from_source_info(info: &SourceCodeInfo) -> Self {
        Self {
            entries: info
                .location
                .iter()
                .filter_map(|loc| {
                    loc.leading_comments
                        .as_ref()
                        .map(|c| (loc.path.clone(), c.clone()))
                })
                .collect(),
        }
    }

    /// Build a table directly from `(path, comment)` pairs.
    #[must_use]
    pub fn from_entries<I, P, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<Vec<i32>>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(p, s)| (p.into(), s.into()))
                .collect(),
        }
    }

    /// Exact-match lookup of a path vector.
    #[must_use]
    pub fn get(&self, path: &[i32]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_slice() == path)
            .map(|(_, c)| c.as_str())
    }

    /// Number of commented locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no comments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comment of field `field_index` in top-level message `message_index`.
    #[must_use]
    pub fn field_comment(&self, message_index: usize, field_index: usize) -> Option<&str> {
        self.get(&[
            location_tag::FILE_MESSAGE_TYPE,
            path_index(message_index)?,
            location_tag::MESSAGE_FIELD,
            path_index(field_index)?,
        ])
    }

    /// Comment of method `method_index` in service `service_index`.
    #[must_use]
    pub fn method_comment(&self, service_index: usize, method_index: usize) -> Option<&str> {
        self.get(&[
            location_tag::FILE_SERVICE,
            path_index(service_index)?,
            location_tag::SERVICE_METHOD,
            path_index(method_index)?,
        ])
    }

    /// Comment of field `field_index` in the message at `message_location`
    /// (works for nested messages, e.g. `[4, 1, 3, 0]`).
    #[must_use]
    pub fn field_comment_at(&self, message_location: &[i32], field_index: usize) -> Option<&str> {
        let mut path = Vec::with_capacity(message_location.len() + 2);
        path.extend_from_slice(message_location);
        path.extend([location_tag::MESSAGE_FIELD, path_index(field_index)?]);
        self.get(&path)
    }
}

fn path_index(i: usize) -> Option<i32> {
    i32::try_from(i).ok()
}

/// Comment attached to a resolved field, looked up in its owning message's file.
#[must_use]
pub fn comment_for_field<'a>(index: &'a SchemaIndex, resolved: &ResolvedField<'_>) -> Option<&'a str> {
    index
        .file(&resolved.message.file)?
        .comments
        .field_comment_at(&resolved.message.location, resolved.field_index)
}

/// Comment attached to method `method_index` of `service`.
#[must_use]
pub fn comment_for_method<'a>(
    index: &'a SchemaIndex,
    service: &ServiceSchema,
    method_index: usize,
) -> Option<&'a str> {
    index
        .file(&service.file)?
        .comments
        .method_comment(service.index, method_index)
}

#[cfg(test)]
mod tests {
    use prost_types::source_code_info::Location;

    use super::*;
    use crate::path::{resolve, FlattenPath};
    use crate::schema::tests::hello_index;

    fn table() -> CommentTable {
        CommentTable::from_entries([
            (vec![4, 2, 2, 1], "field two-one"),
            (vec![4, 2, 2, 0], "field two-zero"),
            (vec![6, 0, 2, 3], "method zero-three"),
            (vec![4, 2], "the message itself"),
        ])
    }

    #[test]
    fn field_comment_exact_match() {
        let table = table();
        assert_eq!(table.field_comment(2, 1), Some("field two-one"));
        assert_eq!(table.field_comment(2, 0), Some("field two-zero"));
        assert_eq!(table.field_comment(2, 2), None);
        assert_eq!(table.field_comment(1, 1), None);
    }

    #[test]
    fn method_comment_exact_match() {
        let table = table();
        assert_eq!(table.method_comment(0, 3), Some("method zero-three"));
        assert_eq!(table.method_comment(0, 2), None);
        // A field vector with the same indices is not a method vector.
        assert_eq!(table.method_comment(2, 1), None);
    }

    #[test]
    fn locations_without_leading_comments_are_skipped() {
        let info = SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![4, 0, 2, 0],
                    span: vec![1, 2, 3],
                    leading_comments: None,
                    trailing_comments: Some(" trailing only\n".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![4, 0, 2, 1],
                    span: vec![2, 2, 3],
                    leading_comments: Some(" second\n".to_string()),
                    trailing_comments: None,
                    ..Default::default()
                },
            ],
        };
        let table = CommentTable::from_source_info(&info);
        assert_eq!(table.len(), 1);
        assert_eq!(table.field_comment(0, 0), None);
        assert_eq!(table.field_comment(0, 1), Some(" second\n"));
    }

    #[test]
    fn nested_message_field_comment() {
        let table = CommentTable::from_entries([(vec![4, 1, 3, 0, 2, 2], "nested")]);
        assert_eq!(table.field_comment_at(&[4, 1, 3, 0], 2), Some("nested"));
        assert_eq!(table.field_comment_at(&[4, 1], 2), None);
    }

    #[test]
    fn comments_for_resolved_field_and_method() {
        let index = hello_index();
        let request = index.message("google.example.HiRequest").unwrap();
        let path: FlattenPath = "query".parse().unwrap();
        let resolved = resolve(&index, request, &path).unwrap();
        assert_eq!(comment_for_field(&index, &resolved), Some(" The query text.\n"));

        let path: FlattenPath = "tags".parse().unwrap();
        let resolved = resolve(&index, request, &path).unwrap();
        assert_eq!(comment_for_field(&index, &resolved), None);

        let service = index.service("google.example.HelloService").unwrap();
        assert_eq!(comment_for_method(&index, service, 0), Some(" Say hi.\n"));
        assert_eq!(comment_for_method(&index, service, 1), None);
    }
}
