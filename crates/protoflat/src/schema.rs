//! Typed schema index built once per generation run.
//!
//! Raw descriptors address types by loosely-typed strings and integer wire
//! kinds. The index resolves all of that up front into [`MessageSchema`],
//! [`FieldSchema`] and [`FieldKind`], so every later stage works against a
//! closed set of variants instead of re-inspecting descriptor protos.

use std::collections::{HashMap, HashSet};

use prost::Message as _;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto, FileDescriptorSet};

use crate::docs::{location_tag, CommentTable};
use crate::error::{Error, Result};

/// Non-reference wire kinds a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PrimitiveKind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl PrimitiveKind {
    /// Map a `FieldDescriptorProto.Type` value to a primitive kind.
    ///
    /// Returns `None` for reference kinds (message, enum), groups and
    /// unknown values.
    #[must_use]
    pub fn from_wire(type_id: i32) -> Option<Self> {
        Some(match Type::try_from(type_id).ok()? {
            Type::Double => Self::Double,
            Type::Float => Self::Float,
            Type::Int64 => Self::Int64,
            Type::Uint64 => Self::Uint64,
            Type::Int32 => Self::Int32,
            Type::Fixed64 => Self::Fixed64,
            Type::Fixed32 => Self::Fixed32,
            Type::Bool => Self::Bool,
            Type::String => Self::String,
            Type::Bytes => Self::Bytes,
            Type::Uint32 => Self::Uint32,
            Type::Sfixed32 => Self::Sfixed32,
            Type::Sfixed64 => Self::Sfixed64,
            Type::Sint32 => Self::Sint32,
            Type::Sint64 => Self::Sint64,
            Type::Group | Type::Message | Type::Enum => return None,
        })
    }
}

/// What a field holds, resolved at index-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A scalar or `bytes` value.
    Primitive(PrimitiveKind),
    /// Reference to an enum, by fully-qualified name (no leading dot).
    Enum(String),
    /// Reference to a message, by fully-qualified name (no leading dot).
    Message(String),
    /// A wire kind with no mapping (proto2 groups, unknown values).
    Unsupported(i32),
}

/// A single field of a [`MessageSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Proto field name (`snake_case`).
    pub name: String,
    /// Field number.
    pub number: i32,
    /// Resolved kind.
    pub kind: FieldKind,
    /// Declared `repeated` (map fields are repeated too).
    pub repeated: bool,
    /// The referenced message is a synthetic `map<K, V>` entry.
    pub map_entry: bool,
}

impl FieldSchema {
    /// Fully-qualified name of the referenced message, if this field holds one.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Message(name) => Some(name),
            _ => None,
        }
    }
}

/// A message type with its ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    /// Fully-qualified name without a leading dot (e.g. `google.example.HiRequest`).
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Name of the `.proto` file that declares this message.
    pub file: String,
    /// Synthetic `map<K, V>` entry type.
    pub map_entry: bool,
    /// Source-location path of the message inside its file
    /// (`[4, i]` top-level, `[4, i, 3, j]` nested, …).
    pub location: Vec<i32>,
}

impl MessageSchema {
    /// Find a field by name, returning its position in [`fields`](Self::fields).
    #[must_use]
    pub fn field(&self, name: &str) -> Option<(usize, &FieldSchema)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

/// An enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    /// Fully-qualified name without a leading dot.
    pub name: String,
    /// Value names in declaration order.
    pub values: Vec<String>,
    /// Name of the declaring `.proto` file.
    pub file: String,
}

/// One RPC of a [`ServiceSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSchema {
    /// Proto method name (e.g. `HiThere`).
    pub name: String,
    /// Fully-qualified request type, no leading dot.
    pub input_type: String,
    /// Fully-qualified response type, no leading dot.
    pub output_type: String,
    /// Client-streaming RPC.
    pub client_streaming: bool,
    /// Server-streaming RPC.
    pub server_streaming: bool,
}

/// A service and its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSchema {
    /// Fully-qualified service name, no leading dot.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodSchema>,
    /// Name of the declaring `.proto` file.
    pub file: String,
    /// Position of the service inside its file (`[6, index]`).
    pub index: usize,
}

/// Per-file data kept alongside the type tables.
#[derive(Debug, Clone, Default)]
pub struct FileSchema {
    /// `.proto` file name as given by the compiler.
    pub name: String,
    /// Proto package (may be empty).
    pub package: String,
    /// Leading comments keyed by source-location path.
    pub comments: CommentTable,
}

/// Result of [`SchemaIndex::lookup`].
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    /// The name refers to a message.
    Message(&'a MessageSchema),
    /// The name refers to an enum.
    Enum(&'a EnumSchema),
}

/// Fully-qualified name → schema lookup over a whole descriptor set.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    messages: HashMap<String, MessageSchema>,
    enums: HashMap<String, EnumSchema>,
    services: Vec<ServiceSchema>,
    files: Vec<FileSchema>,
}

/// Strip the leading `.` protoc puts on fully-qualified names.
pub(crate) fn normalize(type_name: &str) -> &str {
    type_name.strip_prefix('.').unwrap_or(type_name)
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// A message descriptor waiting for its fields to be resolved.
struct PendingMessage<'a> {
    name: String,
    file: &'a str,
    location: Vec<i32>,
    proto: &'a DescriptorProto,
}

fn is_map_entry(msg: &DescriptorProto) -> bool {
    msg.options
        .as_ref()
        .is_some_and(prost_types::MessageOptions::map_entry)
}

impl SchemaIndex {
    /// Build the index from parsed file descriptors.
    ///
    /// Runs in two passes: the first collects every message and enum name
    /// (nested ones as `Outer.Inner`), the second resolves field kinds and
    /// map-entry flags against those names.
    #[must_use]
    pub fn build(files: &[FileDescriptorProto]) -> Self {
        let mut pending = Vec::new();
        let mut enums = HashMap::new();

        for file in files {
            let file_name = file.name.as_deref().unwrap_or("");
            let package = file.package.as_deref().unwrap_or("");
            for (i, msg) in file.message_type.iter().enumerate() {
                collect_message(
                    &mut pending,
                    &mut enums,
                    package,
                    file_name,
                    vec![location_tag::FILE_MESSAGE_TYPE, as_path_index(i)],
                    msg,
                );
            }
            for en in &file.enum_type {
                insert_enum(&mut enums, package, file_name, en);
            }
        }

        let map_entries: HashSet<&str> = pending
            .iter()
            .filter(|m| is_map_entry(m.proto))
            .map(|m| m.name.as_str())
            .collect();

        let mut messages = HashMap::with_capacity(pending.len());
        for msg in &pending {
            let fields = msg
                .proto
                .field
                .iter()
                .map(|field| {
                    let kind = resolve_kind(
                        field.r#type,
                        field.type_name.as_deref(),
                        &enums,
                    );
                    let map_entry = matches!(&kind, FieldKind::Message(n) if map_entries.contains(n.as_str()));
                    FieldSchema {
                        name: field.name.clone().unwrap_or_default(),
                        number: field.number.unwrap_or_default(),
                        kind,
                        repeated: field.label() == Label::Repeated,
                        map_entry,
                    }
                })
                .collect();

            messages.insert(
                msg.name.clone(),
                MessageSchema {
                    name: msg.name.clone(),
                    fields,
                    file: msg.file.to_string(),
                    map_entry: is_map_entry(msg.proto),
                    location: msg.location.clone(),
                },
            );
        }

        let mut services = Vec::new();
        let mut file_schemas = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file.name.as_deref().unwrap_or("");
            let package = file.package.as_deref().unwrap_or("");
            for (index, svc) in file.service.iter().enumerate() {
                services.push(ServiceSchema {
                    name: qualify(package, svc.name.as_deref().unwrap_or("")),
                    methods: svc
                        .method
                        .iter()
                        .map(|m| MethodSchema {
                            name: m.name.clone().unwrap_or_default(),
                            input_type: normalize(m.input_type.as_deref().unwrap_or(""))
                                .to_string(),
                            output_type: normalize(m.output_type.as_deref().unwrap_or(""))
                                .to_string(),
                            client_streaming: m.client_streaming.unwrap_or(false),
                            server_streaming: m.server_streaming.unwrap_or(false),
                        })
                        .collect(),
                    file: file_name.to_string(),
                    index,
                });
            }
            file_schemas.push(FileSchema {
                name: file_name.to_string(),
                package: package.to_string(),
                comments: file
                    .source_code_info
                    .as_ref()
                    .map(CommentTable::from_source_info)
                    .unwrap_or_default(),
            });
        }

        Self {
            messages,
            enums,
            services,
            files: file_schemas,
        }
    }

    /// Decode a serialized `FileDescriptorSet` and build the index from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtoDecode`] if `bytes` is not a valid descriptor set.
    pub fn from_descriptor_set(bytes: &[u8]) -> Result<Self> {
        let fdset = FileDescriptorSet::decode(bytes)?;
        Ok(Self::build(&fdset.file))
    }

    /// Decode a compiler-plugin `CodeGeneratorRequest` and build the index
    /// from every file it carries (imports included).
    ///
    /// Also returns the request's `file_to_generate` list, in request order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtoDecode`] if `bytes` is not a valid plugin request.
    pub fn from_plugin_request(bytes: &[u8]) -> Result<(Self, Vec<String>)> {
        let request = CodeGeneratorRequest::decode(bytes)?;
        Ok((Self::build(&request.proto_file), request.file_to_generate))
    }

    /// Look up a message or enum by fully-qualified name (leading `.` optional).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the name is not indexed.
    pub fn lookup(&self, type_name: &str) -> Result<TypeRef<'_>> {
        let key = normalize(type_name);
        if let Some(msg) = self.messages.get(key) {
            return Ok(TypeRef::Message(msg));
        }
        self.enums
            .get(key)
            .map(TypeRef::Enum)
            .ok_or_else(|| Error::unknown_type(type_name))
    }

    /// Look up a message by fully-qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if no message has that name (enums
    /// included: an enum is not a message).
    pub fn message(&self, type_name: &str) -> Result<&MessageSchema> {
        self.messages
            .get(normalize(type_name))
            .ok_or_else(|| Error::unknown_type(type_name))
    }

    /// Whether a message or enum with this name is indexed.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        let key = normalize(type_name);
        self.messages.contains_key(key) || self.enums.contains_key(key)
    }

    /// All services, in file order then declaration order.
    #[must_use]
    pub fn services(&self) -> &[ServiceSchema] {
        &self.services
    }

    /// Look up a service by fully-qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if no service has that name.
    pub fn service(&self, name: &str) -> Result<&ServiceSchema> {
        let key = normalize(name);
        self.services
            .iter()
            .find(|s| s.name == key)
            .ok_or_else(|| Error::unknown_type(name))
    }

    /// All files, in input order.
    #[must_use]
    pub fn files(&self) -> &[FileSchema] {
        &self.files
    }

    /// Look up a file by its compiler-given name.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileSchema> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Number of indexed messages (map entries included).
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

fn as_path_index(i: usize) -> i32 {
    i32::try_from(i).unwrap_or(i32::MAX)
}

fn collect_message<'a>(
    pending: &mut Vec<PendingMessage<'a>>,
    enums: &mut HashMap<String, EnumSchema>,
    scope: &str,
    file: &'a str,
    location: Vec<i32>,
    msg: &'a DescriptorProto,
) {
    let name = qualify(scope, msg.name.as_deref().unwrap_or(""));

    for (j, nested) in msg.nested_type.iter().enumerate() {
        let mut nested_location = location.clone();
        nested_location.extend([location_tag::MESSAGE_NESTED_TYPE, as_path_index(j)]);
        collect_message(pending, enums, &name, file, nested_location, nested);
    }
    for en in &msg.enum_type {
        insert_enum(enums, &name, file, en);
    }

    pending.push(PendingMessage {
        name,
        file,
        location,
        proto: msg,
    });
}

fn insert_enum(
    enums: &mut HashMap<String, EnumSchema>,
    scope: &str,
    file: &str,
    en: &EnumDescriptorProto,
) {
    let name = qualify(scope, en.name.as_deref().unwrap_or(""));
    enums.insert(
        name.clone(),
        EnumSchema {
            name,
            values: en
                .value
                .iter()
                .map(|v| v.name.clone().unwrap_or_default())
                .collect(),
            file: file.to_string(),
        },
    );
}

/// Resolve a descriptor's `(type, type_name)` pair into a [`FieldKind`].
///
/// Descriptors that carry a `type_name` without a wire type (unlinked
/// descriptors) are classified by checking the collected enum names.
fn resolve_kind(
    type_id: Option<i32>,
    type_name: Option<&str>,
    enums: &HashMap<String, EnumSchema>,
) -> FieldKind {
    let reference = type_name.map(|n| normalize(n).to_string());
    let wire = type_id.map(|id| (id, Type::try_from(id).ok()));
    match (wire, reference) {
        (Some((_, Some(Type::Message))), Some(name)) => FieldKind::Message(name),
        (Some((_, Some(Type::Enum))), Some(name)) => FieldKind::Enum(name),
        (None, Some(name)) if enums.contains_key(&name) => FieldKind::Enum(name),
        (None, Some(name)) => FieldKind::Message(name),
        (Some((id, _)), _) => {
            PrimitiveKind::from_wire(id).map_or(FieldKind::Unsupported(id), FieldKind::Primitive)
        }
        (None, None) => FieldKind::Unsupported(0),
    }
}
