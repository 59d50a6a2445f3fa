//! Request expression tree and the emission capability it is handed to.

use crate::names::upper_camel;
use crate::schema::FieldSchema;

/// How a value is written into a builder field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetterKind {
    /// Merge a whole mapping into a `map<K, V>` field (`putAllFlags`).
    MapSet,
    /// Append one element to a repeated field (`addTags`).
    IndexSet,
    /// Append a whole list to a repeated field (`addAllTags`).
    AddAll,
    /// Assign a singular field (`setQuery`).
    Set,
}

impl SetterKind {
    /// Setter for a flattened field named by the last segment of a path.
    #[must_use]
    pub fn for_terminal(field: &FieldSchema, index: Option<u32>) -> Self {
        if field.map_entry {
            Self::MapSet
        } else if field.repeated && index.is_some() {
            Self::IndexSet
        } else if field.repeated {
            Self::AddAll
        } else {
            Self::Set
        }
    }

    /// Setter used to splice a finished nested builder into its parent.
    ///
    /// A repeated message field receives the single built element. A map
    /// field is a repeated entry message, so its entry builder is added the
    /// same way.
    #[must_use]
    pub fn for_nested(field: &FieldSchema) -> Self {
        if field.repeated {
            Self::IndexSet
        } else {
            Self::Set
        }
    }

    /// Builder method name for `field` (`set`, `add`, `addAll`, `putAll` + `UpperCamel`).
    #[must_use]
    pub fn method_name(self, field: &str) -> String {
        let prefix = match self {
            Self::MapSet => "putAll",
            Self::IndexSet => "add",
            Self::AddAll => "addAll",
            Self::Set => "set",
        };
        format!("{prefix}{}", upper_camel(field))
    }
}

/// The value passed to a setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A flattened method parameter, by name.
    Parameter(String),
    /// A fully finalized nested builder.
    Builder(Box<BuilderNode>),
}

/// One setter call on a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOperation {
    /// Proto field name being written.
    pub field: String,
    /// Which setter to use.
    pub kind: SetterKind,
    /// The value written.
    pub argument: Argument,
}

/// "New builder of `type_name`, apply `operations` in order, finalize."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderNode {
    /// Fully-qualified message name being built.
    pub type_name: String,
    /// Setter calls in application order.
    pub operations: Vec<SetOperation>,
}

impl BuilderNode {
    /// An empty builder of `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            operations: Vec::new(),
        }
    }

    /// First operation writing `field`, if any.
    #[must_use]
    pub fn operation(&self, field: &str) -> Option<&SetOperation> {
        self.operations.iter().find(|op| op.field == field)
    }

    /// Nested builder written into `field`, if any.
    #[must_use]
    pub fn child(&self, field: &str) -> Option<&BuilderNode> {
        match &self.operation(field)?.argument {
            Argument::Builder(node) => Some(node),
            Argument::Parameter(_) => None,
        }
    }

    /// Number of builder nodes in this tree, this one included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .operations
            .iter()
            .map(|op| match &op.argument {
                Argument::Builder(node) => node.node_count(),
                Argument::Parameter(_) => 0,
            })
            .sum::<usize>()
    }

    /// Walk the tree depth-first, handing each step to `emitter`.
    ///
    /// Nested builders are emitted and finalized before the setter that
    /// receives them is applied.
    pub fn emit<E: Emitter>(&self, emitter: &mut E) -> E::Output {
        let mut target = emitter.new_builder(&self.type_name);
        for op in &self.operations {
            let argument = match &op.argument {
                Argument::Parameter(name) => emitter.parameter(name),
                Argument::Builder(node) => node.emit(emitter),
            };
            target = emitter.apply_setter(target, &op.field, op.kind, argument);
        }
        emitter.finalize(target)
    }
}

/// Target-language backend for a [`BuilderNode`] tree.
///
/// Implementations decide the concrete syntax (text, tokens, an AST); the
/// synthesizer only describes which builder calls happen in which order.
pub trait Emitter {
    /// An expression in the target representation.
    type Output;

    /// Start a new builder for message `type_name`.
    fn new_builder(&mut self, type_name: &str) -> Self::Output;

    /// Apply a setter of `kind` for `field` on `target` with `argument`.
    fn apply_setter(
        &mut self,
        target: Self::Output,
        field: &str,
        kind: SetterKind,
        argument: Self::Output,
    ) -> Self::Output;

    /// Finalize a builder into a value.
    fn finalize(&mut self, builder: Self::Output) -> Self::Output;

    /// Reference a method parameter by name.
    fn parameter(&mut self, name: &str) -> Self::Output;
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::{FieldKind, PrimitiveKind};

    /// Renders a Java-style builder chain on one line.
    #[derive(Default)]
    pub(crate) struct ChainEmitter {
        pub(crate) finalized: Vec<String>,
    }

    impl Emitter for ChainEmitter {
        type Output = String;

        fn new_builder(&mut self, type_name: &str) -> String {
            format!("{type_name}.newBuilder()")
        }

        fn apply_setter(&mut self, target: String, field: &str, kind: SetterKind, argument: String) -> String {
            format!("{target}.{}({argument})", kind.method_name(field))
        }

        fn finalize(&mut self, builder: String) -> String {
            let type_name = builder.split(".newBuilder()").next().unwrap_or_default();
            self.finalized.push(type_name.to_string());
            format!("{builder}.build()")
        }

        fn parameter(&mut self, name: &str) -> String {
            name.to_string()
        }
    }

    fn field(repeated: bool, map_entry: bool) -> FieldSchema {
        FieldSchema {
            name: "f".to_string(),
            number: 1,
            kind: if map_entry {
                FieldKind::Message("pkg.FEntry".to_string())
            } else {
                FieldKind::Primitive(PrimitiveKind::String)
            },
            repeated,
            map_entry,
        }
    }

    #[test]
    fn terminal_setter_kinds() {
        assert_eq!(SetterKind::for_terminal(&field(true, true), None), SetterKind::MapSet);
        assert_eq!(SetterKind::for_terminal(&field(true, false), Some(0)), SetterKind::IndexSet);
        assert_eq!(SetterKind::for_terminal(&field(true, false), None), SetterKind::AddAll);
        assert_eq!(SetterKind::for_terminal(&field(false, false), None), SetterKind::Set);
        // An index on a singular field changes nothing.
        assert_eq!(SetterKind::for_terminal(&field(false, false), Some(0)), SetterKind::Set);
    }

    #[test]
    fn nested_setter_kinds() {
        assert_eq!(SetterKind::for_nested(&field(true, false)), SetterKind::IndexSet);
        assert_eq!(SetterKind::for_nested(&field(false, false)), SetterKind::Set);
    }

    #[test]
    fn method_names() {
        assert_eq!(SetterKind::Set.method_name("display_name"), "setDisplayName");
        assert_eq!(SetterKind::AddAll.method_name("tags"), "addAllTags");
        assert_eq!(SetterKind::IndexSet.method_name("tags"), "addTags");
        assert_eq!(SetterKind::MapSet.method_name("flags"), "putAllFlags");
    }

    #[test]
    fn emit_nested_tree_innermost_first() {
        let mut inner = BuilderNode::new("pkg.Inner");
        inner.operations.push(SetOperation {
            field: "note".to_string(),
            kind: SetterKind::Set,
            argument: Argument::Parameter("note".to_string()),
        });
        let mut root = BuilderNode::new("pkg.Req");
        root.operations.push(SetOperation {
            field: "query".to_string(),
            kind: SetterKind::Set,
            argument: Argument::Parameter("query".to_string()),
        });
        root.operations.push(SetOperation {
            field: "inner".to_string(),
            kind: SetterKind::Set,
            argument: Argument::Builder(Box::new(inner)),
        });

        let mut emitter = ChainEmitter::default();
        let code = root.emit(&mut emitter);
        assert_eq!(
            code,
            "pkg.Req.newBuilder().setQuery(query)\
             .setInner(pkg.Inner.newBuilder().setNote(note).build()).build()"
        );
        assert_eq!(emitter.finalized, vec!["pkg.Inner", "pkg.Req"]);
        assert_eq!(root.node_count(), 2);
        assert_eq!(root.child("inner").unwrap().type_name, "pkg.Inner");
        assert!(root.child("query").is_none());
    }
}
