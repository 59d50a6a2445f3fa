//! Per-service, per-method planning over a whole schema.
//!
//! Walks every generated file that declares services, and for each method
//! runs the configured flattenings, paging and long-running resolution and
//! the comment lookups. A failure only marks its own entry; the rest of the
//! plan is still produced.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::config::{FlattenConfig, MethodConfig};
use crate::docs::{comment_for_field, comment_for_method};
use crate::error::{Error, Result};
use crate::path::resolve;
use crate::response::{is_long_running, paged_element_type, LroConvention};
use crate::schema::{MethodSchema, SchemaIndex, ServiceSchema};
use crate::synth::{synthesize, Synthesis};
use crate::types::ParamType;

/// Files never planned, even when listed for generation.
pub const SKIPPED_FILES: &[&str] = &[
    "google/bytestream/bytestream.proto",
    "google/longrunning/operations.proto",
];

/// Which files [`plan`] walks.
///
/// # Examples
///
/// ```
/// let options = protoflat::PlanOptions::new()
///     .file_to_generate("google/example/hello.proto")
///     .skip_file("google/example/internal.proto");
/// assert!(options.includes("google/example/hello.proto"));
/// assert!(!options.includes("google/longrunning/operations.proto"));
/// ```
#[derive(Clone, Debug)]
pub struct PlanOptions {
    /// When non-empty, only these files are planned.
    files_to_generate: HashSet<String>,
    /// Files excluded regardless of `files_to_generate`.
    skip_files: HashSet<String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            files_to_generate: HashSet::new(),
            skip_files: SKIPPED_FILES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl PlanOptions {
    /// Create options that plan every file except [`SKIPPED_FILES`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict planning to `file` (and any other file added the same way).
    #[must_use]
    pub fn file_to_generate(mut self, file: impl Into<String>) -> Self {
        self.files_to_generate.insert(file.into());
        self
    }

    /// Restrict planning to `files`, e.g. a plugin request's `file_to_generate`.
    #[must_use]
    pub fn files_to_generate<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files_to_generate.extend(files.into_iter().map(Into::into));
        self
    }

    /// Never plan `file`.
    #[must_use]
    pub fn skip_file(mut self, file: impl Into<String>) -> Self {
        self.skip_files.insert(file.into());
        self
    }

    /// Whether `file` is planned under these options.
    #[must_use]
    pub fn includes(&self, file: &str) -> bool {
        !self.skip_files.contains(file)
            && (self.files_to_generate.is_empty() || self.files_to_generate.contains(file))
    }
}

/// One synthesized flattening with its parameter comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattening {
    /// Parameters and request builder tree.
    pub synthesis: Synthesis,
    /// Leading comment of each parameter's source field, aligned with
    /// `synthesis.parameters`.
    pub parameter_comments: Vec<Option<String>>,
}

/// Everything resolved for one method.
#[derive(Debug)]
pub struct MethodPlan {
    /// Proto method name.
    pub name: String,
    /// Fully-qualified request type.
    pub input_type: String,
    /// Fully-qualified response type.
    pub output_type: String,
    /// Leading comment on the method.
    pub comment: Option<String>,
    /// One entry per configured flattening group, in config order.
    pub flattenings: Vec<Result<Flattening>>,
    /// Paged list element type, for methods configured with paging.
    pub paged_element: Option<Result<ParamType>>,
    /// Payload type, for methods returning a long-running operation.
    pub long_running_response: Option<Result<String>>,
}

impl MethodPlan {
    /// Every failure recorded for this method.
    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.flattenings
            .iter()
            .filter_map(|f| f.as_ref().err())
            .chain(self.paged_element.iter().filter_map(|r| r.as_ref().err()))
            .chain(self.long_running_response.iter().filter_map(|r| r.as_ref().err()))
    }
}

/// Everything resolved for one service.
#[derive(Debug)]
pub struct ServicePlan {
    /// Fully-qualified service name.
    pub name: String,
    /// Declaring `.proto` file.
    pub file: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodPlan>,
}

/// Result of [`plan`].
#[derive(Debug, Default)]
pub struct Plan {
    /// Planned services, in file order then declaration order.
    pub services: Vec<ServicePlan>,
}

impl Plan {
    /// Total number of failed entries across all methods.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.services
            .iter()
            .flat_map(|s| &s.methods)
            .map(|m| m.errors().count())
            .sum()
    }

    /// Look up a planned method by service and method name.
    #[must_use]
    pub fn method(&self, service: &str, method: &str) -> Option<&MethodPlan> {
        self.services
            .iter()
            .find(|s| s.name == service)?
            .methods
            .iter()
            .find(|m| m.name == method)
    }
}

/// Plan every eligible service of `index` against `config`.
///
/// Never fails as a whole: each flattening, paging or long-running failure
/// is stored in its method's entry and logged.
#[must_use]
pub fn plan(index: &SchemaIndex, config: &FlattenConfig, options: &PlanOptions) -> Plan {
    let convention = config.lro_convention();
    let mut services = Vec::new();

    for service in index.services() {
        if !options.includes(&service.file) {
            debug!(service = %service.name, file = %service.file, "skipping service outside generated files");
            continue;
        }
        debug!(service = %service.name, methods = service.methods.len(), "planning service");
        services.push(plan_service(index, config, &convention, service));
    }

    for name in config.services.keys() {
        if index.service(name).is_err() {
            error!(service = %name, "configured service not found in schema; skipped");
        }
    }

    Plan { services }
}

fn plan_service(
    index: &SchemaIndex,
    config: &FlattenConfig,
    convention: &LroConvention,
    service: &ServiceSchema,
) -> ServicePlan {
    if let Some(configured) = config.services.get(&service.name) {
        for name in configured.methods.keys() {
            if !service.methods.iter().any(|m| &m.name == name) {
                warn!(service = %service.name, method = %name, "configured method not found in service");
            }
        }
    }

    let methods = service
        .methods
        .iter()
        .enumerate()
        .map(|(i, method)| {
            let method_config = config.method(&service.name, &method.name);
            let planned = plan_method(index, convention, method, method_config);
            for err in planned.errors() {
                warn!(service = %service.name, method = %method.name, error = %err, "method entry failed to plan");
            }
            MethodPlan {
                comment: comment_for_method(index, service, i).map(ToString::to_string),
                ..planned
            }
        })
        .collect();

    ServicePlan {
        name: service.name.clone(),
        file: service.file.clone(),
        methods,
    }
}

fn plan_method(
    index: &SchemaIndex,
    convention: &LroConvention,
    method: &MethodSchema,
    config: Option<&MethodConfig>,
) -> MethodPlan {
    let flattenings = config
        .map(|c| {
            c.flattening
                .iter()
                .map(|group| flatten(index, &method.input_type, &group.parameters))
                .collect()
        })
        .unwrap_or_default();

    let paged_element = config
        .and_then(|c| c.paging.as_ref())
        .map(|paging| paged_element_type(index, &method.output_type, &paging.response_list));

    let long_running_response = is_long_running(method).then(|| {
        convention
            .response_type(index, method)
            .map(ToString::to_string)
    });

    MethodPlan {
        name: method.name.clone(),
        input_type: method.input_type.clone(),
        output_type: method.output_type.clone(),
        comment: None,
        flattenings,
        paged_element,
        long_running_response,
    }
}

fn flatten(index: &SchemaIndex, request_type: &str, paths: &[String]) -> Result<Flattening> {
    let synthesis = synthesize(index, request_type, paths)?;
    for name in synthesis.name_collisions() {
        warn!(request = %request_type, parameter = %name, "flattened parameter name collides");
    }

    let root = index.message(request_type)?;
    let parameter_comments = synthesis
        .parameters
        .iter()
        .map(|param| {
            let resolved = resolve(index, root, &param.path)?;
            Ok(comment_for_field(index, &resolved).map(ToString::to_string))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Flattening {
        synthesis,
        parameter_comments,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use prost_types::field_descriptor_proto::Type;
    use prost_types::{FileDescriptorProto, ServiceDescriptorProto};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;
    use crate::schema::tests::{hello_file, make_file, make_message, make_method};

    fn config() -> FlattenConfig {
        FlattenConfig::parse(indoc! {r#"
            services:
              google.example.HelloService:
                methods:
                  HiThere:
                    flattening:
                      - parameters: [query]
                      - parameters: [query, "tags[3]"]
                      - parameters: [detail.inner.note, mood]
                    paging:
                      response_list: results
        "#})
        .unwrap()
    }

    fn lro_file() -> FileDescriptorProto {
        let mut file = make_file(
            "google/example/ops.proto",
            "google.example",
            vec![
                make_message("RunRequest", &[("job", Type::String, None, false)]),
                make_message("RunResponse", &[]),
                make_message("StopCall", &[]),
            ],
        );
        file.service.push(ServiceDescriptorProto {
            name: Some("Jobs".to_string()),
            method: vec![
                make_method("Run", ".google.example.RunRequest", ".google.longrunning.Operation"),
                make_method("Stop", ".google.example.StopCall", ".google.longrunning.Operation"),
            ],
            ..Default::default()
        });
        file
    }

    #[test]
    fn plans_configured_method() {
        let index = SchemaIndex::build(&[hello_file()]);
        let plan = plan(&index, &config(), &PlanOptions::new());

        let method = plan.method("google.example.HelloService", "HiThere").unwrap();
        assert_eq!(method.comment.as_deref(), Some(" Say hi.\n"));
        assert_eq!(method.flattenings.len(), 3);

        let first = method.flattenings[0].as_ref().unwrap();
        assert_eq!(first.synthesis.parameters[0].name, "query");
        assert_eq!(first.parameter_comments, vec![Some(" The query text.\n".to_string())]);

        // a bad group does not affect its siblings
        assert!(matches!(
            method.flattenings[1],
            Err(Error::UnsupportedIndex { .. })
        ));
        let third = method.flattenings[2].as_ref().unwrap();
        assert_eq!(third.parameter_comments, vec![None, None]);

        assert_eq!(
            method.paged_element.as_ref().unwrap().as_ref().unwrap().to_string(),
            "string"
        );
        assert!(method.long_running_response.is_none());
        assert_eq!(plan.failure_count(), 1);
    }

    #[test]
    fn long_running_methods_resolve_payload() {
        let index = SchemaIndex::build(&[hello_file(), lro_file()]);
        let plan = plan(&index, &FlattenConfig::default(), &PlanOptions::new());

        let run = plan.method("google.example.Jobs", "Run").unwrap();
        assert_eq!(
            run.long_running_response.as_ref().unwrap().as_ref().unwrap(),
            "google.example.RunResponse"
        );
        let stop = plan.method("google.example.Jobs", "Stop").unwrap();
        assert!(matches!(
            stop.long_running_response,
            Some(Err(Error::NamingConvention { .. }))
        ));
        assert!(stop.flattenings.is_empty());
        assert_eq!(plan.failure_count(), 1);
    }

    #[test]
    fn options_restrict_files() {
        let index = SchemaIndex::build(&[hello_file(), lro_file()]);
        let options = PlanOptions::new().files_to_generate(["google/example/ops.proto"]);
        let plan = plan(&index, &FlattenConfig::default(), &options);
        let names: Vec<_> = plan.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["google.example.Jobs"]);

        let options = PlanOptions::new().skip_file("google/example/ops.proto");
        let plan = super::plan(&index, &FlattenConfig::default(), &options);
        let names: Vec<_> = plan.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["google.example.HelloService"]);
    }

    #[test]
    fn well_known_operation_files_are_skipped() {
        let mut ops = make_file("google/longrunning/operations.proto", "google.longrunning", vec![
            make_message("GetOperationRequest", &[]),
            make_message("Operation", &[]),
        ]);
        ops.service.push(ServiceDescriptorProto {
            name: Some("Operations".to_string()),
            method: vec![make_method(
                "GetOperation",
                ".google.longrunning.GetOperationRequest",
                ".google.longrunning.Operation",
            )],
            ..Default::default()
        });
        let index = SchemaIndex::build(&[ops, hello_file()]);
        let options = PlanOptions::new()
            .file_to_generate("google/longrunning/operations.proto")
            .file_to_generate("google/example/hello.proto");

        let plan = plan(&index, &FlattenConfig::default(), &options);
        assert_eq!(plan.services.len(), 1);
        assert_eq!(plan.services[0].name, "google.example.HelloService");
    }

    #[test]
    fn unconfigured_methods_still_planned() {
        let index = SchemaIndex::build(&[hello_file()]);
        let plan = plan(&index, &FlattenConfig::default(), &PlanOptions::new());
        let method = plan.method("google.example.HelloService", "HiThere").unwrap();
        assert!(method.flattenings.is_empty());
        assert!(method.paged_element.is_none());
        assert_eq!(method.errors().count(), 0);
    }

    /// Records the field names of every event.
    #[derive(Clone, Default)]
    struct EventFields(Arc<Mutex<Vec<Vec<&'static str>>>>);

    impl<S: tracing::Subscriber> Layer<S> for EventFields {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut names: Vec<_> = event.metadata().fields().iter().map(|f| f.name()).collect();
            names.sort_unstable();
            self.0.lock().unwrap().push(names);
        }
    }

    #[test]
    fn diagnostics_carry_structured_fields() {
        let index = SchemaIndex::build(&[hello_file()]);
        let events = EventFields::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());

        tracing::subscriber::with_default(subscriber, || {
            plan(&index, &config(), &PlanOptions::new());
        });

        let events = events.0.lock().unwrap();
        assert!(
            events.contains(&vec!["message", "methods", "service"]),
            "got {events:?}"
        );
        assert!(
            events.contains(&vec!["error", "message", "method", "service"]),
            "got {events:?}"
        );
    }
}
