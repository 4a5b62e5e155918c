//! ddl-core: plugin interface DDL for RPC plugins.
//!
//! This crate contains the pure descriptor logic with no transport or
//! dispatch dependencies:
//! - AST types for raw DDL forms (`Script`, `Form`, `AstNode`, ...)
//! - Nom-based s-expression parser
//! - Tagged directive lowering and the schema builder
//! - The descriptor model with kind-gated accessors
//! - Request validation against a finished descriptor
//! - The aggregate-function registry boundary
//! - CLI coercion helpers and plain-text help rendering
//!
//! A plugin's interface is described once in a `.ddl` file, loaded into
//! an immutable [`PluginDescriptor`], and then shared read-only by every
//! request validation.

pub mod aggregate;
pub mod ast;
pub mod builder;
pub mod coerce;
pub mod descriptor;
pub mod directive;
pub mod help;
pub mod loader;
pub mod parser;
pub mod request;

// Re-export commonly used types
pub use aggregate::{AggregateRegistry, StaticRegistry};
pub use ast::{Argument, AstNode, Form, Literal, Script, Span};
pub use builder::{EntityContext, ProcessRole, SchemaBuilder};
pub use coerce::{string_to_boolean, string_to_number, CoerceError};
pub use descriptor::{
    ActionInterface, AggregateCall, DataQueryInterface, DiscoveryCapability, DiscoveryInterface,
    DisplayPolicy, EntityDescriptor, InputDescriptor, InputType, Metadata, OutputDescriptor,
    PluginDescriptor, PluginKind, SchemaError,
};
pub use directive::{lower_form, lower_script, Directive};
pub use loader::{DdlError, DdlLoader, DDL_PATH_ENV};
pub use parser::{parse_script, parse_single_form};
pub use request::{validate_request, RequestError};
