//! Descriptor model for plugin interfaces.
//!
//! A [`PluginDescriptor`] is built once per load by the schema builder and
//! is immutable afterwards; any number of request validations may share it
//! read-only. The plugin kind is fixed at construction and gates which
//! entities a DDL may declare and which accessors are legal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Entity key for the single data-query interface of a data plugin.
pub const DATA_ENTITY: &str = "data";
/// Entity key for the single discovery interface of a discovery plugin.
pub const DISCOVERY_ENTITY: &str = "discovery";

/// The category of pluggable component a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Agent,
    Data,
    Discovery,
}

impl PluginKind {
    /// Directory name used when resolving DDL files on the search path.
    pub fn dir_name(&self) -> &'static str {
        match self {
            PluginKind::Agent => "agent",
            PluginKind::Data => "data",
            PluginKind::Discovery => "discovery",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for PluginKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(PluginKind::Agent),
            "data" => Ok(PluginKind::Data),
            "discovery" => Ok(PluginKind::Discovery),
            other => Err(SchemaError::InvalidPluginKind {
                got: other.to_string(),
            }),
        }
    }
}

/// When an action's result should be shown in user-facing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPolicy {
    Ok,
    #[default]
    Failed,
    Flatten,
    Always,
}

impl FromStr for DisplayPolicy {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(DisplayPolicy::Ok),
            "failed" => Ok(DisplayPolicy::Failed),
            "flatten" => Ok(DisplayPolicy::Flatten),
            "always" => Ok(DisplayPolicy::Always),
            other => Err(SchemaError::InvalidDisplayPolicy {
                got: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DisplayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayPolicy::Ok => "ok",
            DisplayPolicy::Failed => "failed",
            DisplayPolicy::Flatten => "flatten",
            DisplayPolicy::Always => "always",
        })
    }
}

/// What a discovery plugin can discover against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryCapability {
    Classes,
    Facts,
    Identity,
    Agents,
    Compound,
}

impl FromStr for DiscoveryCapability {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classes" => Ok(DiscoveryCapability::Classes),
            "facts" => Ok(DiscoveryCapability::Facts),
            "identity" => Ok(DiscoveryCapability::Identity),
            "agents" => Ok(DiscoveryCapability::Agents),
            "compound" => Ok(DiscoveryCapability::Compound),
            other => Err(SchemaError::InvalidCapability {
                got: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DiscoveryCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscoveryCapability::Classes => "classes",
            DiscoveryCapability::Facts => "facts",
            DiscoveryCapability::Identity => "identity",
            DiscoveryCapability::Agents => "agents",
            DiscoveryCapability::Compound => "compound",
        })
    }
}

/// Declared type of an action or data-query input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    List,
    Boolean,
    Integer,
    Float,
    Number,
}

impl FromStr for InputType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(InputType::String),
            "list" => Ok(InputType::List),
            "boolean" => Ok(InputType::Boolean),
            "integer" => Ok(InputType::Integer),
            "float" => Ok(InputType::Float),
            "number" => Ok(InputType::Number),
            other => Err(SchemaError::InvalidInputType {
                got: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputType::String => "string",
            InputType::List => "list",
            InputType::Boolean => "boolean",
            InputType::Integer => "integer",
            InputType::Float => "float",
            InputType::Number => "number",
        })
    }
}

/// Plugin metadata: all seven fields are required by the `metadata`
/// directive and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub version: String,
    pub url: String,
    /// Agent timeout in seconds
    pub timeout: u64,
}

/// A declared input of an action or data query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub prompt: String,
    pub description: String,
    pub input_type: InputType,
    pub optional: bool,
    /// Whole-value pattern; present iff `input_type` is `String`
    pub validation: Option<String>,
    /// Present iff `input_type` is `String`; 0 disables length checking
    pub maxlength: Option<u64>,
    /// Legal values; present iff `input_type` is `List`
    pub list: Option<Vec<Value>>,
}

/// A declared output of an action or data query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub description: String,
    pub display_as: String,
    pub default: Option<Value>,
}

/// A recognized aggregate-function reference from a `summarize` region.
///
/// Only the aggregate-function recognizer produces these; they are never
/// hand-constructed from a directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    pub function: String,
    pub args: Vec<Value>,
    pub format: Option<String>,
}

/// The interface of a single RPC action of an agent plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInterface {
    pub name: String,
    pub description: String,
    pub display: DisplayPolicy,
    pub inputs: HashMap<String, InputDescriptor>,
    pub outputs: HashMap<String, OutputDescriptor>,
    pub aggregates: Vec<AggregateCall>,
}

impl ActionInterface {
    pub(crate) fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            display: DisplayPolicy::default(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            aggregates: Vec::new(),
        }
    }
}

/// The single query interface of a data plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQueryInterface {
    pub description: String,
    /// Only key allowed is "query"
    pub input: HashMap<String, InputDescriptor>,
    pub output: HashMap<String, OutputDescriptor>,
}

/// The single capability declaration of a discovery plugin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscoveryInterface {
    pub capabilities: Vec<DiscoveryCapability>,
}

/// A named unit of interface within a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityDescriptor {
    Action(ActionInterface),
    DataQuery(DataQueryInterface),
    Discovery(DiscoveryInterface),
}

/// The complete, validated calling interface of one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    kind: PluginKind,
    metadata: Metadata,
    entities: HashMap<String, EntityDescriptor>,
}

impl PluginDescriptor {
    pub(crate) fn new(
        kind: PluginKind,
        metadata: Metadata,
        entities: HashMap<String, EntityDescriptor>,
    ) -> Self {
        Self {
            kind,
            metadata,
            entities,
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn entities(&self) -> &HashMap<String, EntityDescriptor> {
        &self.entities
    }

    /// Names of all declared actions. Agent plugins only.
    pub fn actions(&self) -> Result<Vec<&str>, SchemaError> {
        self.expect_kind(PluginKind::Agent, "actions")?;
        Ok(self.entities.keys().map(String::as_str).collect())
    }

    /// The declared interface of one action. Agent plugins only.
    pub fn action_interface(&self, name: &str) -> Result<&ActionInterface, SchemaError> {
        self.expect_kind(PluginKind::Agent, "action interface")?;
        match self.entities.get(name) {
            Some(EntityDescriptor::Action(action)) => Ok(action),
            _ => Err(SchemaError::UnknownEntity {
                name: name.to_string(),
            }),
        }
    }

    /// The single query interface. Data plugins only.
    pub fn dataquery_interface(&self) -> Result<&DataQueryInterface, SchemaError> {
        self.expect_kind(PluginKind::Data, "data query interface")?;
        match self.entities.get(DATA_ENTITY) {
            Some(EntityDescriptor::DataQuery(dq)) => Ok(dq),
            _ => Err(SchemaError::UnknownEntity {
                name: DATA_ENTITY.to_string(),
            }),
        }
    }

    /// The single discovery interface. Discovery plugins only.
    pub fn discovery_interface(&self) -> Result<&DiscoveryInterface, SchemaError> {
        self.expect_kind(PluginKind::Discovery, "discovery interface")?;
        match self.entities.get(DISCOVERY_ENTITY) {
            Some(EntityDescriptor::Discovery(d)) => Ok(d),
            _ => Err(SchemaError::UnknownEntity {
                name: DISCOVERY_ENTITY.to_string(),
            }),
        }
    }

    fn expect_kind(&self, want: PluginKind, what: &'static str) -> Result<(), SchemaError> {
        if self.kind == want {
            Ok(())
        } else {
            Err(SchemaError::WrongKindAccess {
                what,
                kind: self.kind,
            })
        }
    }
}

/// Load-time schema violation. Fatal to the load: there is no partially
/// valid descriptor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("metadata is missing required field '{field}'")]
    MissingMetadataField { field: &'static str },

    #[error("metadata may only be declared once")]
    MetadataRedefined,

    #[error("DDL for plugin '{plugin}' declares no metadata")]
    MissingMetadata { plugin: String },

    #[error("'{got}' is not a plugin kind (agent, data, discovery)")]
    InvalidPluginKind { got: String },

    #[error("'{directive}' directive is not valid for a {kind} plugin")]
    WrongPluginKind { directive: String, kind: PluginKind },

    #[error("'{directive}' directive used outside of an entity block")]
    NoEntityContext { directive: String },

    #[error("'{directive}' directive may not appear inside this block (offset {position})")]
    NotAllowedHere { directive: String, position: usize },

    #[error("unknown directive '{name}' at offset {position}")]
    UnknownDirective { name: String, position: usize },

    #[error("'{directive}' directive at offset {position} is missing its positional argument")]
    MissingName {
        directive: &'static str,
        position: usize,
    },

    #[error("'{directive}' directive does not take a nested block (offset {position})")]
    UnexpectedBlock {
        directive: &'static str,
        position: usize,
    },

    #[error("'{directive}' directive requires a '{field}' field")]
    MissingField {
        directive: &'static str,
        field: &'static str,
    },

    #[error("'{directive}' field '{field}' must be {expected}")]
    InvalidFieldValue {
        directive: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("plugin already declares a {entity} interface")]
    DuplicateEntity { entity: &'static str },

    #[error("input type must be one of string, list, boolean, integer, float, number; got '{got}'")]
    InvalidInputType { got: String },

    #[error("display policy must be one of ok, failed, flatten, always; got '{got}'")]
    InvalidDisplayPolicy { got: String },

    #[error(
        "capabilities must be drawn from classes, facts, identity, agents, compound; got '{got}'"
    )]
    InvalidCapability { got: String },

    #[error("capabilities list may not be empty")]
    EmptyCapabilities,

    #[error("data plugin input must be named 'query'; got '{got}'")]
    InvalidDataInput { got: String },

    #[error("aggregate function '{function}' needs at least one argument")]
    EmptyAggregateArgs { function: String },

    #[error("invalid validation pattern '{pattern}': {message}")]
    InvalidValidationPattern { pattern: String, message: String },

    #[error("cannot read {what} from a {kind} plugin")]
    WrongKindAccess { what: &'static str, kind: PluginKind },

    #[error("plugin declares no entity named '{name}'")]
    UnknownEntity { name: String },
}
