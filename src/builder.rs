//! Schema builder: applies lowered directives to assemble a descriptor.
//!
//! Every structural invariant is enforced at the directive that violates
//! it, not after the full pass; the first [`SchemaError`] aborts the load
//! and no partial descriptor escapes. The "current entity" is an explicit
//! [`EntityContext`] value handed to nested application, so nothing leaks
//! between loads and re-entrant loads cannot observe each other.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::aggregate::AggregateRegistry;
use crate::ast::{Argument, AstNode, Form, Literal};
use crate::descriptor::{
    ActionInterface, AggregateCall, DataQueryInterface, DiscoveryInterface, EntityDescriptor,
    InputDescriptor, InputType, Metadata, OutputDescriptor, PluginDescriptor, PluginKind,
    SchemaError, DATA_ENTITY, DISCOVERY_ENTITY,
};
use crate::directive::{lower_form, Directive};

/// Role of the process evaluating the DDL.
///
/// The authoritative server never evaluates `summarize` regions; display
/// aggregation only matters to clients assembling results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Server,
    Client,
}

/// The entity a nested directive applies to. Passed explicitly; never a
/// long-lived mutable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityContext {
    Action(String),
    Data,
    Discovery,
}

/// Incrementally assembles a [`PluginDescriptor`] from directives.
pub struct SchemaBuilder {
    plugin: String,
    kind: PluginKind,
    aggregate_mode: bool,
    registry: Arc<dyn AggregateRegistry>,
    metadata: Option<Metadata>,
    entities: HashMap<String, EntityDescriptor>,
}

impl SchemaBuilder {
    pub fn new(
        plugin: impl Into<String>,
        kind: PluginKind,
        role: ProcessRole,
        registry: Arc<dyn AggregateRegistry>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            kind,
            aggregate_mode: role == ProcessRole::Client,
            registry,
            metadata: None,
            entities: HashMap::new(),
        }
    }

    /// Apply directives in source order, failing on the first violation.
    pub fn apply_all(&mut self, directives: &[Directive]) -> Result<(), SchemaError> {
        for directive in directives {
            self.apply(directive)?;
        }
        Ok(())
    }

    /// Apply one top-level directive.
    pub fn apply(&mut self, directive: &Directive) -> Result<(), SchemaError> {
        match directive {
            Directive::Metadata { args, .. } => self.metadata(args),
            Directive::Action {
                name, args, body, ..
            } => self.action(name, args, body),
            Directive::Dataquery { args, body, .. } => self.dataquery(args, body),
            Directive::Discovery { body, .. } => self.discovery(body),
            other => Err(SchemaError::NoEntityContext {
                directive: other.name().to_string(),
            }),
        }
    }

    /// Finish the build. The descriptor is immutable from here on.
    pub fn finish(self) -> Result<PluginDescriptor, SchemaError> {
        let metadata = self.metadata.ok_or(SchemaError::MissingMetadata {
            plugin: self.plugin.clone(),
        })?;
        Ok(PluginDescriptor::new(self.kind, metadata, self.entities))
    }

    // ========================================================================
    // Top-level directives
    // ========================================================================

    fn metadata(&mut self, args: &[Argument]) -> Result<(), SchemaError> {
        if self.metadata.is_some() {
            return Err(SchemaError::MetadataRedefined);
        }

        self.metadata = Some(Metadata {
            name: metadata_string(args, "name")?,
            description: metadata_string(args, "description")?,
            author: metadata_string(args, "author")?,
            license: metadata_string(args, "license")?,
            version: metadata_string(args, "version")?,
            url: metadata_string(args, "url")?,
            timeout: metadata_timeout(args)?,
        });
        Ok(())
    }

    fn action(
        &mut self,
        name: &str,
        args: &[Argument],
        body: &[Directive],
    ) -> Result<(), SchemaError> {
        self.expect_kind(PluginKind::Agent, "action")?;
        let description = require_string(args, "action", "description")?;

        // First definition wins on the entity shell; a repeated name still
        // runs its block against the existing action (incremental attachment).
        if !self.entities.contains_key(name) {
            self.entities.insert(
                name.to_string(),
                EntityDescriptor::Action(ActionInterface::new(name, description)),
            );
        } else {
            debug!(plugin = %self.plugin, action = name, "action redeclared; attaching to existing entity");
        }

        let ctx = EntityContext::Action(name.to_string());
        for directive in body {
            self.apply_nested(&ctx, directive)?;
        }
        Ok(())
    }

    fn dataquery(&mut self, args: &[Argument], body: &[Directive]) -> Result<(), SchemaError> {
        self.expect_kind(PluginKind::Data, "dataquery")?;
        if self.entities.contains_key(DATA_ENTITY) {
            return Err(SchemaError::DuplicateEntity {
                entity: "data query",
            });
        }
        let description = require_string(args, "dataquery", "description")?;

        self.entities.insert(
            DATA_ENTITY.to_string(),
            EntityDescriptor::DataQuery(DataQueryInterface {
                description,
                input: HashMap::new(),
                output: HashMap::new(),
            }),
        );

        let ctx = EntityContext::Data;
        for directive in body {
            self.apply_nested(&ctx, directive)?;
        }
        Ok(())
    }

    fn discovery(&mut self, body: &[Directive]) -> Result<(), SchemaError> {
        self.expect_kind(PluginKind::Discovery, "discovery")?;
        if self.entities.contains_key(DISCOVERY_ENTITY) {
            return Err(SchemaError::DuplicateEntity {
                entity: "discovery",
            });
        }

        self.entities.insert(
            DISCOVERY_ENTITY.to_string(),
            EntityDescriptor::Discovery(DiscoveryInterface::default()),
        );

        let ctx = EntityContext::Discovery;
        for directive in body {
            self.apply_nested(&ctx, directive)?;
        }
        Ok(())
    }

    // ========================================================================
    // Entity-level directives
    // ========================================================================

    fn apply_nested(
        &mut self,
        ctx: &EntityContext,
        directive: &Directive,
    ) -> Result<(), SchemaError> {
        match directive {
            Directive::Input { name, args, .. } => self.input(ctx, name, args),
            Directive::Output { name, args, .. } => self.output(ctx, name, args),
            Directive::Display { policy, span } => self.display(ctx, policy, span.start),
            Directive::Summarize { calls, .. } => self.summarize(ctx, calls),
            Directive::Capabilities { caps, .. } => self.capabilities(ctx, caps),
            other => Err(SchemaError::NotAllowedHere {
                directive: other.name().to_string(),
                position: other.span().start,
            }),
        }
    }

    fn input(&mut self, ctx: &EntityContext, name: &str, args: &[Argument]) -> Result<(), SchemaError> {
        if *ctx == EntityContext::Discovery {
            return Err(SchemaError::NotAllowedHere {
                directive: "input".to_string(),
                position: 0,
            });
        }
        if self.kind == PluginKind::Data && name != "query" {
            return Err(SchemaError::InvalidDataInput {
                got: name.to_string(),
            });
        }

        let prompt = require_string(args, "input", "prompt")?;
        let description = require_string(args, "input", "description")?;
        let input_type: InputType = require_string(args, "input", "type")?.parse()?;

        // Agent plugins must spell out whether an input may be omitted.
        let optional = match get(args, "optional") {
            Some(node) => node.as_boolean().ok_or(SchemaError::InvalidFieldValue {
                directive: "input",
                field: "optional",
                expected: "a boolean",
            })?,
            None if self.kind == PluginKind::Agent => {
                return Err(SchemaError::MissingField {
                    directive: "input",
                    field: "optional",
                })
            }
            None => false,
        };

        let mut validation = None;
        let mut maxlength = None;
        let mut list = None;

        match input_type {
            InputType::String => {
                let pattern = require_string(args, "input", "validation")?;
                if let Err(e) = Regex::new(&pattern) {
                    return Err(SchemaError::InvalidValidationPattern {
                        pattern,
                        message: e.to_string(),
                    });
                }
                validation = Some(pattern);
                maxlength = Some(require_u64(args, "input", "maxlength")?);
            }
            InputType::List => {
                let node = get(args, "list").ok_or(SchemaError::MissingField {
                    directive: "input",
                    field: "list",
                })?;
                let items = node.as_list().ok_or(SchemaError::InvalidFieldValue {
                    directive: "input",
                    field: "list",
                    expected: "a list of values",
                })?;
                list = Some(items.iter().map(AstNode::to_json).collect());
            }
            _ => {}
        }

        let descriptor = InputDescriptor {
            prompt,
            description,
            input_type,
            optional,
            validation,
            maxlength,
            list,
        };

        match ctx {
            EntityContext::Action(action) => {
                self.action_mut(action)?.inputs.insert(name.to_string(), descriptor);
            }
            EntityContext::Data => {
                self.dataquery_mut()?.input.insert(name.to_string(), descriptor);
            }
            EntityContext::Discovery => unreachable!("filtered above"),
        }
        Ok(())
    }

    fn output(&mut self, ctx: &EntityContext, name: &str, args: &[Argument]) -> Result<(), SchemaError> {
        let descriptor = OutputDescriptor {
            description: require_string(args, "output", "description")?,
            display_as: require_string(args, "output", "display-as")?,
            default: get(args, "default").map(AstNode::to_json),
        };

        match ctx {
            EntityContext::Action(action) => {
                self.action_mut(action)?.outputs.insert(name.to_string(), descriptor);
            }
            EntityContext::Data => {
                self.dataquery_mut()?.output.insert(name.to_string(), descriptor);
            }
            EntityContext::Discovery => {
                return Err(SchemaError::NotAllowedHere {
                    directive: "output".to_string(),
                    position: 0,
                })
            }
        }
        Ok(())
    }

    fn display(&mut self, ctx: &EntityContext, policy: &str, position: usize) -> Result<(), SchemaError> {
        let policy = policy.parse()?;
        match ctx {
            EntityContext::Action(action) => {
                self.action_mut(action)?.display = policy;
                Ok(())
            }
            _ => Err(SchemaError::NotAllowedHere {
                directive: "display".to_string(),
                position,
            }),
        }
    }

    /// Evaluate a `summarize` region.
    ///
    /// Two-phase dispatch: a child that lowers to a known directive is
    /// applied normally; an unknown name is an aggregate-function
    /// reference only if the registry recognizes it, and only in
    /// aggregate mode. Anything else propagates as the standard
    /// unknown-directive failure so typos are never swallowed.
    fn summarize(&mut self, ctx: &EntityContext, calls: &[Form]) -> Result<(), SchemaError> {
        let action = match ctx {
            EntityContext::Action(action) => action.clone(),
            _ => {
                return Err(SchemaError::NotAllowedHere {
                    directive: "summarize".to_string(),
                    position: 0,
                })
            }
        };

        if !self.aggregate_mode {
            warn!(plugin = %self.plugin, action = %action, "skipping summarize region in server role");
            return Ok(());
        }

        for call in calls {
            match lower_form(call) {
                Ok(directive) => self.apply_nested(ctx, &directive)?,
                Err(SchemaError::UnknownDirective { name, position }) => {
                    if self.registry.is_function(&name) {
                        self.aggregate(&action, &name, call)?;
                    } else {
                        return Err(SchemaError::UnknownDirective { name, position });
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn aggregate(&mut self, action: &str, function: &str, call: &Form) -> Result<(), SchemaError> {
        let args: Vec<serde_json::Value> = call.positional.iter().map(AstNode::to_json).collect();
        if args.is_empty() {
            return Err(SchemaError::EmptyAggregateArgs {
                function: function.to_string(),
            });
        }

        // A format is merged in only when it is actually given and non-null.
        let format = match call.get_value("format") {
            Some(AstNode::Literal(Literal::Null)) | None => None,
            Some(node) => Some(node.as_string().map(str::to_string).ok_or(
                SchemaError::InvalidFieldValue {
                    directive: "aggregate",
                    field: "format",
                    expected: "a string",
                },
            )?),
        };

        self.action_mut(action)?.aggregates.push(AggregateCall {
            function: function.to_string(),
            args,
            format,
        });
        Ok(())
    }

    fn capabilities(&mut self, ctx: &EntityContext, caps: &[AstNode]) -> Result<(), SchemaError> {
        if self.kind != PluginKind::Discovery || *ctx != EntityContext::Discovery {
            return Err(SchemaError::WrongPluginKind {
                directive: "capabilities".to_string(),
                kind: self.kind,
            });
        }
        if caps.is_empty() {
            return Err(SchemaError::EmptyCapabilities);
        }

        let mut parsed = Vec::with_capacity(caps.len());
        for cap in caps {
            let name = cap.as_string().ok_or(SchemaError::InvalidFieldValue {
                directive: "capabilities",
                field: "capability",
                expected: "a string",
            })?;
            parsed.push(name.parse()?);
        }

        let interface = self.discovery_mut()?;
        for cap in parsed {
            if !interface.capabilities.contains(&cap) {
                interface.capabilities.push(cap);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn expect_kind(&self, want: PluginKind, directive: &str) -> Result<(), SchemaError> {
        if self.kind == want {
            Ok(())
        } else {
            Err(SchemaError::WrongPluginKind {
                directive: directive.to_string(),
                kind: self.kind,
            })
        }
    }

    fn action_mut(&mut self, name: &str) -> Result<&mut ActionInterface, SchemaError> {
        match self.entities.get_mut(name) {
            Some(EntityDescriptor::Action(action)) => Ok(action),
            _ => Err(SchemaError::UnknownEntity {
                name: name.to_string(),
            }),
        }
    }

    fn dataquery_mut(&mut self) -> Result<&mut DataQueryInterface, SchemaError> {
        match self.entities.get_mut(DATA_ENTITY) {
            Some(EntityDescriptor::DataQuery(dq)) => Ok(dq),
            _ => Err(SchemaError::UnknownEntity {
                name: DATA_ENTITY.to_string(),
            }),
        }
    }

    fn discovery_mut(&mut self) -> Result<&mut DiscoveryInterface, SchemaError> {
        match self.entities.get_mut(DISCOVERY_ENTITY) {
            Some(EntityDescriptor::Discovery(d)) => Ok(d),
            _ => Err(SchemaError::UnknownEntity {
                name: DISCOVERY_ENTITY.to_string(),
            }),
        }
    }
}

fn get<'a>(args: &'a [Argument], key: &str) -> Option<&'a AstNode> {
    args.iter().find(|a| a.key == key).map(|a| &a.value)
}

fn require_string(
    args: &[Argument],
    directive: &'static str,
    field: &'static str,
) -> Result<String, SchemaError> {
    match get(args, field) {
        Some(node) => node
            .as_string()
            .map(str::to_string)
            .ok_or(SchemaError::InvalidFieldValue {
                directive,
                field,
                expected: "a string",
            }),
        None => Err(SchemaError::MissingField { directive, field }),
    }
}

fn require_u64(
    args: &[Argument],
    directive: &'static str,
    field: &'static str,
) -> Result<u64, SchemaError> {
    match get(args, field) {
        Some(node) => node
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or(SchemaError::InvalidFieldValue {
                directive,
                field,
                expected: "a non-negative integer",
            }),
        None => Err(SchemaError::MissingField { directive, field }),
    }
}

fn metadata_string(args: &[Argument], field: &'static str) -> Result<String, SchemaError> {
    match get(args, field) {
        Some(node) => node
            .as_string()
            .map(str::to_string)
            .ok_or(SchemaError::InvalidFieldValue {
                directive: "metadata",
                field,
                expected: "a string",
            }),
        None => Err(SchemaError::MissingMetadataField { field }),
    }
}

fn metadata_timeout(args: &[Argument]) -> Result<u64, SchemaError> {
    match get(args, "timeout") {
        Some(node) => node
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or(SchemaError::InvalidFieldValue {
                directive: "metadata",
                field: "timeout",
                expected: "a non-negative integer",
            }),
        None => Err(SchemaError::MissingMetadataField { field: "timeout" }),
    }
}
