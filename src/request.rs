//! Request validation against a finished descriptor.
//!
//! Pure and read-only: validating the same request against the same
//! descriptor any number of times yields the same result, and many
//! validations may share one descriptor concurrently. Failures are
//! per-request conditions for the caller to report back; they never
//! poison the descriptor.

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::descriptor::{InputType, PluginDescriptor, PluginKind};

/// Why a request was rejected. Always names the plugin, the action, and
/// the violating argument so the caller can show a useful diagnostic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("plugin '{plugin}' has no action '{action}'")]
    UnknownAction { plugin: String, action: String },

    #[error("action '{action}' of plugin '{plugin}' needs a '{key}' argument")]
    MissingRequiredArgument {
        plugin: String,
        action: String,
        key: String,
    },

    #[error("argument '{key}' to {plugin}#{action} is longer than {max} characters")]
    ArgumentTooLong {
        plugin: String,
        action: String,
        key: String,
        max: u64,
        length: usize,
    },

    #[error("argument '{key}' to {plugin}#{action} does not match '{pattern}'")]
    ArgumentPatternMismatch {
        plugin: String,
        action: String,
        key: String,
        pattern: String,
    },

    #[error("argument '{key}' to {plugin}#{action} is not one of the declared values")]
    ArgumentNotInList {
        plugin: String,
        action: String,
        key: String,
    },

    #[error("argument '{key}' to {plugin}#{action} should be a {expected}")]
    ArgumentTypeMismatch {
        plugin: String,
        action: String,
        key: String,
        expected: &'static str,
    },

    #[error("cannot validate requests against a {kind} plugin")]
    WrongPluginKind { kind: PluginKind },
}

/// Check a concrete call against an agent plugin's descriptor.
///
/// Declared inputs are enforced per their type; arguments the DDL does
/// not declare are allowed through untouched (callers routinely pass
/// extra context keys alongside the declared inputs). The first failing
/// check is reported; checks are not aggregated.
pub fn validate_request(
    ddl: &PluginDescriptor,
    action: &str,
    args: &Map<String, Value>,
) -> Result<(), RequestError> {
    if ddl.kind() != PluginKind::Agent {
        return Err(RequestError::WrongPluginKind { kind: ddl.kind() });
    }

    let plugin = ddl.metadata().name.as_str();
    let interface = ddl
        .action_interface(action)
        .map_err(|_| RequestError::UnknownAction {
            plugin: plugin.to_string(),
            action: action.to_string(),
        })?;

    for (key, input) in &interface.inputs {
        let value = match args.get(key) {
            Some(value) => value,
            None if input.optional => continue,
            None => {
                return Err(RequestError::MissingRequiredArgument {
                    plugin: plugin.to_string(),
                    action: action.to_string(),
                    key: key.clone(),
                })
            }
        };

        validate_value(plugin, action, key, input, value)?;
    }

    Ok(())
}

fn validate_value(
    plugin: &str,
    action: &str,
    key: &str,
    input: &crate::descriptor::InputDescriptor,
    value: &Value,
) -> Result<(), RequestError> {
    let mismatch = |expected: &'static str| RequestError::ArgumentTypeMismatch {
        plugin: plugin.to_string(),
        action: action.to_string(),
        key: key.to_string(),
        expected,
    };

    match input.input_type {
        InputType::String => {
            let text = value.as_str().ok_or_else(|| mismatch("string"))?;

            if let Some(max) = input.maxlength {
                // maxlength 0 disables length checking
                if max > 0 && text.chars().count() as u64 > max {
                    return Err(RequestError::ArgumentTooLong {
                        plugin: plugin.to_string(),
                        action: action.to_string(),
                        key: key.to_string(),
                        max,
                        length: text.chars().count(),
                    });
                }
            }

            if let Some(pattern) = &input.validation {
                // Whole-value match. Pattern validity is enforced when the
                // descriptor is built.
                let anchored = format!("^(?:{pattern})$");
                let matched = Regex::new(&anchored)
                    .map(|re| re.is_match(text))
                    .unwrap_or(false);
                if !matched {
                    return Err(RequestError::ArgumentPatternMismatch {
                        plugin: plugin.to_string(),
                        action: action.to_string(),
                        key: key.to_string(),
                        pattern: pattern.clone(),
                    });
                }
            }
            Ok(())
        }
        InputType::List => {
            let allowed = input.list.as_deref().unwrap_or(&[]);
            if allowed.contains(value) {
                Ok(())
            } else {
                Err(RequestError::ArgumentNotInList {
                    plugin: plugin.to_string(),
                    action: action.to_string(),
                    key: key.to_string(),
                })
            }
        }
        InputType::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(mismatch("boolean"))
            }
        }
        InputType::Integer => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err(mismatch("whole number"))
            }
        }
        InputType::Float => {
            if value.is_f64() {
                Ok(())
            } else {
                Err(mismatch("floating point number"))
            }
        }
        InputType::Number => {
            if value.is_number() {
                Ok(())
            } else {
                Err(mismatch("number"))
            }
        }
    }
}
