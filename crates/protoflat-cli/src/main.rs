//! CLI for `protoflat`.
//!
//! # Subcommands
//!
//! ```text
//! # Plan every configured method of a descriptor set
//! protoflat plan --descriptor descriptor.bin --config protoflat.yaml
//!
//! # Input delivered as a serialized CodeGeneratorRequest
//! protoflat plan --descriptor request.bin --plugin-request --config protoflat.yaml
//!
//! # Resolve one flatten path against one message
//! protoflat resolve --descriptor descriptor.bin \
//!   --type google.example.HiRequest --path detail.inner.note
//! ```

#![forbid(unsafe_code)]

mod render;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use protoflat::docs::comment_for_field;
use protoflat::{plan, resolve_str, synthesize, FlattenConfig, PlanOptions, SchemaIndex, SetterKind};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use render::{signature, summary, ChainRenderer};

/// Flattened-method planner for protobuf services.
#[derive(Parser)]
#[command(name = "protoflat", version, about)]
enum Cli {
    /// Plan flattenings, paging and long-running payloads for every
    /// configured method and print them as builder chains.
    Plan(PlanArgs),

    /// Resolve one dotted path against a message and print its parameter type.
    Resolve(ResolveArgs),
}

#[derive(Parser)]
struct PlanArgs {
    /// Path to the compiled proto `FileDescriptorSet` (binary).
    #[arg(short, long)]
    descriptor: PathBuf,

    /// Treat `--descriptor` as a serialized `CodeGeneratorRequest`; only its
    /// `file_to_generate` entries are planned.
    #[arg(long)]
    plugin_request: bool,

    /// Path to the flattening config YAML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only plan these `.proto` files (repeatable, comma-separated).
    #[arg(long, value_delimiter = ',')]
    file: Vec<String>,

    /// Never plan these `.proto` files (repeatable, comma-separated).
    #[arg(long, value_delimiter = ',')]
    skip: Vec<String>,

    /// Exit with an error if any method entry failed.
    #[arg(long)]
    strict: bool,
}

#[derive(Parser)]
struct ResolveArgs {
    /// Path to the compiled proto `FileDescriptorSet` (binary).
    #[arg(short, long)]
    descriptor: PathBuf,

    /// Fully-qualified message to resolve against.
    #[arg(short = 't', long = "type")]
    type_name: String,

    /// Dotted field path (e.g. `detail.inner.note`, `tags[0]`).
    #[arg(short, long)]
    path: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match Cli::parse() {
        Cli::Plan(args) => run_plan(&args),
        Cli::Resolve(args) => run_resolve(&args),
    }
}

fn run_plan(args: &PlanArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => {
            eprintln!("Loading config: {}", path.display());
            FlattenConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => FlattenConfig::default(),
    };
    debug!(services = config.services.len(), "flattening config ready");

    let bytes = fs::read(&args.descriptor)
        .with_context(|| format!("Failed to read descriptor: {}", args.descriptor.display()))?;

    let mut options = PlanOptions::new().files_to_generate(args.file.iter().cloned());
    for skipped in &args.skip {
        options = options.skip_file(skipped.clone());
    }

    let index = if args.plugin_request {
        let (index, to_generate) = SchemaIndex::from_plugin_request(&bytes)
            .context("Failed to decode plugin request")?;
        options = options.files_to_generate(to_generate);
        index
    } else {
        SchemaIndex::from_descriptor_set(&bytes).context("Failed to decode descriptor set")?
    };
    eprintln!(
        "Indexed {} messages, {} services",
        index.message_count(),
        index.services().len(),
    );

    let plan = plan(&index, &config, &options);

    for service in &plan.services {
        println!("service {} ({})", service.name, service.file);
        for method in &service.methods {
            print_method(method);
        }
    }

    let failures = plan.failure_count();
    eprintln!("Planned {} services, {failures} failures", plan.services.len());
    if args.strict && failures > 0 {
        bail!("{failures} method entries failed to plan");
    }
    Ok(())
}

fn print_method(method: &protoflat::plan::MethodPlan) {
    match method.comment.as_deref().map(summary) {
        Some(doc) if !doc.is_empty() => println!("  rpc {}  // {doc}", method.name),
        _ => println!("  rpc {}", method.name),
    }

    for flattening in &method.flattenings {
        match flattening {
            Ok(f) => {
                println!("    {}", signature(&method.name, &f.synthesis.parameters));
                println!("      {}", f.synthesis.request.emit(&mut ChainRenderer));
                let collisions = f.synthesis.name_collisions();
                if !collisions.is_empty() {
                    println!("      ! colliding parameter names: {}", collisions.join(", "));
                }
            }
            Err(err) => println!("    ! {err}"),
        }
    }

    match &method.paged_element {
        Some(Ok(element)) => println!("    paged: {element}"),
        Some(Err(err)) => println!("    ! paging: {err}"),
        None => {}
    }
    match &method.long_running_response {
        Some(Ok(payload)) => println!("    long-running: {payload}"),
        Some(Err(err)) => println!("    ! long-running: {err}"),
        None => {}
    }
}

fn run_resolve(args: &ResolveArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.descriptor)
        .with_context(|| format!("Failed to read descriptor: {}", args.descriptor.display()))?;
    let index =
        SchemaIndex::from_descriptor_set(&bytes).context("Failed to decode descriptor set")?;

    let root = index.message(&args.type_name)?;
    let resolved = resolve_str(&index, root, &args.path)
        .with_context(|| format!("Failed to resolve '{}' on {}", args.path, root.name))?;
    let synthesis = synthesize(&index, &args.type_name, &[args.path.as_str()])?;
    let ty = &synthesis.parameters[0].ty;
    let setter = SetterKind::for_terminal(resolved.field, resolved.index);

    println!("field:   {}.{}", resolved.message.name, resolved.field.name);
    println!("type:    {ty}");
    println!("setter:  {}", setter.method_name(&resolved.field.name));
    if let Some(comment) = comment_for_field(&index, &resolved) {
        println!("comment: {}", summary(comment));
    }
    Ok(())
}
