//! End-to-end: load a service agent DDL from disk and validate requests
//! against it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use ddl_core::{
    validate_request, DdlError, DdlLoader, DisplayPolicy, InputType, PluginKind, ProcessRole,
    RequestError, StaticRegistry,
};

const SERVICE_DDL: &str = r#"
;; service agent - start, stop and query system services
(metadata :name "service" :description "Start and stop system services"
          :author "R.I. Pienaar" :license "ASL-2.0" :version "4.1"
          :url "https://example.net/plugins/service" :timeout 60)

(action "status" :description "Gets the status of a service"
  (display "always")
  (input "service" :prompt "Service Name" :description "The service to act on"
         :type "string" :optional false
         :validation "^[a-zA-Z\\-_\\d]+$" :maxlength 30)
  (output "status" :description "The status of the service"
          :display-as "Service Status" :default "unknown")
  (summarize
    (summary "status")))

(action "restart" :description "Restarts a service"
  (input "service" :prompt "Service Name" :description "The service to act on"
         :type "string" :optional false
         :validation "^[a-zA-Z\\-_\\d]+$" :maxlength 30)
  (output "status" :description "The status of the service"
          :display-as "Service Status"))
"#;

fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn write_ddl(root: &Path, kind: &str, plugin: &str, source: &str) {
    let dir = root.join(kind);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{plugin}.ddl")), source).unwrap();
}

#[test]
fn loads_and_validates_service_requests() {
    let tmp = tempfile::tempdir().unwrap();
    write_ddl(tmp.path(), "agent", "service", SERVICE_DDL);

    let loader = DdlLoader::new(vec![tmp.path().to_path_buf()], ProcessRole::Client);
    let ddl = loader.load("service", PluginKind::Agent).unwrap();

    // A well-formed request passes
    assert_eq!(
        validate_request(&ddl, "status", &args(&[("service", json!("nginx"))])),
        Ok(())
    );

    // Pattern violations are rejected with the violating key
    let err =
        validate_request(&ddl, "status", &args(&[("service", json!("nginx!"))])).unwrap_err();
    assert_eq!(
        err,
        RequestError::ArgumentPatternMismatch {
            plugin: "service".to_string(),
            action: "status".to_string(),
            key: "service".to_string(),
            pattern: r"^[a-zA-Z\-_\d]+$".to_string(),
        }
    );

    // Omitting a required input names the action and the key
    let err = validate_request(&ddl, "status", &args(&[])).unwrap_err();
    assert_eq!(
        err,
        RequestError::MissingRequiredArgument {
            plugin: "service".to_string(),
            action: "status".to_string(),
            key: "service".to_string(),
        }
    );

    // Unknown actions are rejected up front
    assert_eq!(
        validate_request(&ddl, "enable", &args(&[])),
        Err(RequestError::UnknownAction {
            plugin: "service".to_string(),
            action: "enable".to_string(),
        })
    );
}

#[test]
fn descriptor_round_trips_the_declared_interface() {
    let loader = DdlLoader::new(Vec::new(), ProcessRole::Client);
    let ddl = loader
        .load_str("service", PluginKind::Agent, SERVICE_DDL)
        .unwrap();

    let mut actions = ddl.actions().unwrap();
    actions.sort_unstable();
    assert_eq!(actions, vec!["restart", "status"]);

    let status = ddl.action_interface("status").unwrap();
    assert_eq!(status.name, "status");
    assert_eq!(status.description, "Gets the status of a service");
    assert_eq!(status.display, DisplayPolicy::Always);

    // Exactly the declared inputs and outputs, nothing added or dropped
    assert_eq!(status.inputs.len(), 1);
    let input = &status.inputs["service"];
    assert_eq!(input.prompt, "Service Name");
    assert_eq!(input.description, "The service to act on");
    assert_eq!(input.input_type, InputType::String);
    assert!(!input.optional);
    assert_eq!(input.validation.as_deref(), Some(r"^[a-zA-Z\-_\d]+$"));
    assert_eq!(input.maxlength, Some(30));
    assert_eq!(input.list, None);

    assert_eq!(status.outputs.len(), 1);
    let output = &status.outputs["status"];
    assert_eq!(output.description, "The status of the service");
    assert_eq!(output.display_as, "Service Status");
    assert_eq!(output.default, Some(json!("unknown")));

    assert_eq!(status.aggregates.len(), 1);
    assert_eq!(status.aggregates[0].function, "summary");
    assert_eq!(status.aggregates[0].args, vec![json!("status")]);

    // The restart action never declared a display policy
    let restart = ddl.action_interface("restart").unwrap();
    assert_eq!(restart.display, DisplayPolicy::Failed);
    assert!(restart.aggregates.is_empty());
}

#[test]
fn server_role_ignores_summarize_regions() {
    let loader = DdlLoader::new(Vec::new(), ProcessRole::Server);
    let ddl = loader
        .load_str("service", PluginKind::Agent, SERVICE_DDL)
        .unwrap();
    assert!(ddl.action_interface("status").unwrap().aggregates.is_empty());
}

#[test]
fn custom_registry_controls_recognition() {
    // With an empty registry even the stock names are unknown directives
    let loader = DdlLoader::new(Vec::new(), ProcessRole::Client)
        .with_registry(Arc::new(StaticRegistry::default()));

    let err = loader
        .load_str("service", PluginKind::Agent, SERVICE_DDL)
        .unwrap_err();
    assert!(matches!(
        err,
        DdlError::Schema(ddl_core::SchemaError::UnknownDirective { ref name, .. })
            if name == "summary"
    ));
}

#[test]
fn missing_plugin_is_retryable_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = DdlLoader::new(vec![tmp.path().to_path_buf()], ProcessRole::Client);

    match loader.load("service", PluginKind::Agent) {
        Err(DdlError::DescriptorNotFound { plugin, kind }) => {
            assert_eq!(plugin, "service");
            assert_eq!(kind, PluginKind::Agent);
        }
        other => panic!("expected DescriptorNotFound, got {other:?}"),
    }

    // Dropping the file in afterwards makes the same call succeed
    write_ddl(tmp.path(), "agent", "service", SERVICE_DDL);
    assert!(loader.load("service", PluginKind::Agent).is_ok());
}
