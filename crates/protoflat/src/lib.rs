#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod docs;
mod error;
pub mod names;
pub mod path;
pub mod plan;
pub mod response;
pub mod schema;
pub mod synth;
pub mod types;

pub use config::FlattenConfig;
pub use error::{Error, Result};
pub use path::{resolve, resolve_str, FlattenPath, PathSegment, ResolvedField};
pub use plan::{plan, Plan, PlanOptions};
pub use response::{is_long_running, long_running_response_type, paged_element_type, LroConvention};
pub use schema::SchemaIndex;
pub use synth::{synthesize, BuilderNode, Emitter, ParameterSpec, SetterKind, Synthesis};
pub use types::{classify, ParamType, ScalarType};
