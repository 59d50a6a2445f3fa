//! Flattening synthesis: dotted paths → parameters + request builder tree.
//!
//! Given a request message and an ordered list of flatten paths, produces one
//! parameter per path and a [`BuilderNode`] tree that constructs the full
//! request by setting only those fields, creating every intermediate nested
//! builder on the way.
//!
//! # Architecture
//!
//! Assembly is two-phase. Phase one walks depths `1..=max_depth`: paths that
//! end at the current depth attach a setter to the node owning their parent
//! prefix, and longer paths make sure a node exists for their prefix at that
//! depth (one node per distinct prefix key). Phase two finalizes every node in
//! order of decreasing depth and splices it into its parent, so a parent only
//! ever receives a finished child; the root is finalized last.

mod expr;

pub use expr::{Argument, BuilderNode, Emitter, SetOperation, SetterKind};

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::names::parameter_name;
use crate::path::{resolve, traverse, FlattenPath};
use crate::schema::SchemaIndex;
use crate::types::{classify, ParamType};

/// One flattened method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Parameter name (`lowerCamelCase` of the path's final field).
    pub name: String,
    /// Inferred parameter type.
    pub ty: ParamType,
    /// The path this parameter was flattened from.
    pub path: FlattenPath,
}

/// Result of [`synthesize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    /// One parameter per input path, in input order.
    pub parameters: Vec<ParameterSpec>,
    /// Builder tree for the request message.
    pub request: BuilderNode,
    /// Keys of every builder node in the order they were finalized; the root
    /// is the last entry, keyed `""`.
    pub finalize_order: Vec<String>,
}

impl Synthesis {
    /// Parameter names that occur more than once, in first-seen order.
    #[must_use]
    pub fn name_collisions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut collisions = Vec::new();
        for param in &self.parameters {
            let name = param.name.as_str();
            if !seen.insert(name) && !collisions.contains(&name) {
                collisions.push(name);
            }
        }
        collisions
    }
}

/// Synthesize parameters and a request builder tree for `request_type`.
///
/// # Errors
///
/// - [`Error::UnknownType`](crate::Error::UnknownType) if `request_type` is not an indexed message
/// - any path parsing, resolution or classification error, for the first
///   path that fails; no partial result is returned
pub fn synthesize<S: AsRef<str>>(
    index: &SchemaIndex,
    request_type: &str,
    paths: &[S],
) -> Result<Synthesis> {
    let root = index.message(request_type)?;
    let paths = paths
        .iter()
        .map(|p| FlattenPath::parse(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let mut parameters = Vec::with_capacity(paths.len());
    for path in &paths {
        let resolved = resolve(index, root, path)?;
        parameters.push(ParameterSpec {
            name: parameter_name(&path.terminal().name),
            ty: classify(index, resolved.field)?,
            path: path.clone(),
        });
    }

    let mut table = BuilderTable::new(&root.name);
    let max_depth = paths.iter().map(FlattenPath::len).max().unwrap_or(0);

    for depth in 1..=max_depth {
        // terminal paths: set the value on the parent builder
        for (path, param) in paths.iter().zip(&parameters) {
            if path.len() != depth {
                continue;
            }
            let resolved = resolve(index, root, path)?;
            table.attach(
                &path.key(depth - 1),
                SetOperation {
                    field: resolved.field.name.clone(),
                    kind: SetterKind::for_terminal(resolved.field, resolved.index),
                    argument: Argument::Parameter(param.name.clone()),
                },
            );
        }

        // non-terminal paths: ensure a builder exists for the prefix
        for path in paths.iter().filter(|p| p.len() > depth) {
            let key = path.key(depth);
            if table.contains(&key) {
                continue;
            }
            let prefix = resolve(index, root, &path.prefix(depth))?;
            let message = traverse(index, prefix.field, path.as_str())?;
            table.open(
                key,
                &path.key(depth - 1),
                depth,
                BuilderNode::new(&message.name),
                prefix.field.name.clone(),
                SetterKind::for_nested(prefix.field),
            );
        }
    }

    let (request, finalize_order) = table.finalize();
    Ok(Synthesis {
        parameters,
        request,
        finalize_order,
    })
}

/// A nested builder still accepting set-operations.
struct PendingNode {
    key: String,
    depth: usize,
    /// Owning node; `None` is the root.
    parent: Option<usize>,
    builder: BuilderNode,
    /// Field of the parent that receives this builder.
    field: String,
    kind: SetterKind,
}

/// Transient prefix-key → pending builder table for one synthesis call.
struct BuilderTable {
    root: BuilderNode,
    nodes: Vec<PendingNode>,
    by_key: HashMap<String, usize>,
}

impl BuilderTable {
    fn new(root_type: &str) -> Self {
        Self {
            root: BuilderNode::new(root_type),
            nodes: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Node owning `key`; the empty key (and only it) maps to the root.
    fn owner(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    fn attach(&mut self, parent_key: &str, op: SetOperation) {
        match self.owner(parent_key) {
            Some(i) => self.nodes[i].builder.operations.push(op),
            None => self.root.operations.push(op),
        }
    }

    fn open(
        &mut self,
        key: String,
        parent_key: &str,
        depth: usize,
        builder: BuilderNode,
        field: String,
        kind: SetterKind,
    ) {
        let parent = self.owner(parent_key);
        self.by_key.insert(key.clone(), self.nodes.len());
        self.nodes.push(PendingNode {
            key,
            depth,
            parent,
            builder,
            field,
            kind,
        });
    }

    /// Finalize every node innermost-first, splicing each into its parent.
    ///
    /// Nodes of equal depth keep creation order. Returns the root and the
    /// finalize order of keys, ending with the root's `""`.
    fn finalize(mut self) -> (BuilderNode, Vec<String>) {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by(|&a, &b| self.nodes[b].depth.cmp(&self.nodes[a].depth));

        let mut finalized = Vec::with_capacity(self.nodes.len() + 1);
        for i in order {
            let node = &mut self.nodes[i];
            let parent = node.parent;
            let op = SetOperation {
                field: std::mem::take(&mut node.field),
                kind: node.kind,
                argument: Argument::Builder(Box::new(std::mem::replace(
                    &mut node.builder,
                    BuilderNode::new(String::new()),
                ))),
            };
            finalized.push(std::mem::take(&mut node.key));

            match parent {
                Some(p) => self.nodes[p].builder.operations.push(op),
                None => self.root.operations.push(op),
            }
        }
        finalized.push(String::new());

        (self.root, finalized)
    }
}
