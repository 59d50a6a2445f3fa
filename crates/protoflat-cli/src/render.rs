//! Text rendering of plans for terminal output.

use protoflat::{Emitter, ParameterSpec, SetterKind};

/// Renders a builder tree as a one-line builder chain
/// (`Foo.newBuilder().setBar(bar).build()`).
#[derive(Debug, Default)]
pub struct ChainRenderer;

impl Emitter for ChainRenderer {
    type Output = String;

    fn new_builder(&mut self, type_name: &str) -> String {
        format!("{type_name}.newBuilder()")
    }

    fn apply_setter(
        &mut self,
        target: String,
        field: &str,
        kind: SetterKind,
        argument: String,
    ) -> String {
        format!("{target}.{}({argument})", kind.method_name(field))
    }

    fn finalize(&mut self, builder: String) -> String {
        format!("{builder}.build()")
    }

    fn parameter(&mut self, name: &str) -> String {
        name.to_string()
    }
}

/// `Method(name: type, ...)` for one flattening.
pub fn signature(method: &str, parameters: &[ParameterSpec]) -> String {
    let params = parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{method}({params})")
}

/// First line of a leading comment, trimmed.
pub fn summary(comment: &str) -> &str {
    comment.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}
