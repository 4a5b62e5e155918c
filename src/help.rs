//! Plain-text help rendering for a finished descriptor.
//!
//! Template-engine rendering is an external concern; this module only
//! formats the read-only view of a descriptor into the terminal help a
//! CLI shows for `plugin doc`-style commands.

use std::fmt::Write;

use crate::descriptor::{
    ActionInterface, EntityDescriptor, InputDescriptor, OutputDescriptor, PluginDescriptor,
    PluginKind,
};

/// Render a descriptor as human-readable help text.
pub fn render(ddl: &PluginDescriptor) -> String {
    let mut out = String::new();
    let meta = ddl.metadata();

    let _ = writeln!(out, "{}", meta.name);
    let _ = writeln!(out, "{}", "=".repeat(meta.name.len()));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", meta.description);
    let _ = writeln!(out);
    let _ = writeln!(out, "      Author: {}", meta.author);
    let _ = writeln!(out, "     Version: {}", meta.version);
    let _ = writeln!(out, "     License: {}", meta.license);
    let _ = writeln!(out, "     Timeout: {}", meta.timeout);
    let _ = writeln!(out, "         URL: {}", meta.url);
    let _ = writeln!(out);

    match ddl.kind() {
        PluginKind::Agent => render_actions(&mut out, ddl),
        PluginKind::Data => render_dataquery(&mut out, ddl),
        PluginKind::Discovery => render_discovery(&mut out, ddl),
    }

    out
}

fn render_actions(out: &mut String, ddl: &PluginDescriptor) {
    let _ = writeln!(out, "ACTIONS:");
    let _ = writeln!(out, "========");

    let mut names: Vec<&str> = ddl.entities().keys().map(String::as_str).collect();
    names.sort_unstable();

    for name in &names {
        let _ = writeln!(out, "   {name}");
    }
    let _ = writeln!(out);

    for name in names {
        if let Some(EntityDescriptor::Action(action)) = ddl.entities().get(name) {
            render_action(out, action);
        }
    }
}

fn render_action(out: &mut String, action: &ActionInterface) {
    let _ = writeln!(out, "   {} action:", action.name);
    let _ = writeln!(out, "   {}", "-".repeat(action.name.len() + 8));
    let _ = writeln!(out, "       {}", action.description);
    let _ = writeln!(out);

    render_inputs(out, &action.inputs);
    render_outputs(out, &action.outputs);
}

fn render_inputs(out: &mut String, inputs: &std::collections::HashMap<String, InputDescriptor>) {
    if inputs.is_empty() {
        return;
    }
    let _ = writeln!(out, "       INPUT:");

    let mut names: Vec<&str> = inputs.keys().map(String::as_str).collect();
    names.sort_unstable();

    for name in names {
        let input = &inputs[name];
        let _ = writeln!(out, "           {name}:");
        let _ = writeln!(out, "              Description: {}", input.description);
        let _ = writeln!(out, "                   Prompt: {}", input.prompt);
        let _ = writeln!(out, "                     Type: {}", input.input_type);
        let _ = writeln!(out, "                 Optional: {}", input.optional);
        if let Some(validation) = &input.validation {
            let _ = writeln!(out, "               Validation: {validation}");
        }
        if let Some(maxlength) = input.maxlength {
            let _ = writeln!(out, "               Max Length: {maxlength}");
        }
        if let Some(list) = &input.list {
            let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "           Valid Values: {}", rendered.join(", "));
        }
        let _ = writeln!(out);
    }
}

fn render_outputs(out: &mut String, outputs: &std::collections::HashMap<String, OutputDescriptor>) {
    if outputs.is_empty() {
        return;
    }
    let _ = writeln!(out, "       OUTPUT:");

    let mut names: Vec<&str> = outputs.keys().map(String::as_str).collect();
    names.sort_unstable();

    for name in names {
        let output = &outputs[name];
        let _ = writeln!(out, "           {name}:");
        let _ = writeln!(out, "              Description: {}", output.description);
        let _ = writeln!(out, "               Display As: {}", output.display_as);
        if let Some(default) = &output.default {
            let _ = writeln!(out, "                  Default: {default}");
        }
        let _ = writeln!(out);
    }
}

fn render_dataquery(out: &mut String, ddl: &PluginDescriptor) {
    let _ = writeln!(out, "QUERY INTERFACE:");
    let _ = writeln!(out, "================");

    if let Ok(dq) = ddl.dataquery_interface() {
        let _ = writeln!(out, "       {}", dq.description);
        let _ = writeln!(out);
        render_inputs(out, &dq.input);
        render_outputs(out, &dq.output);
    }
}

fn render_discovery(out: &mut String, ddl: &PluginDescriptor) {
    let _ = writeln!(out, "DISCOVERY CAPABILITIES:");
    let _ = writeln!(out, "=======================");

    if let Ok(discovery) = ddl.discovery_interface() {
        for cap in &discovery.capabilities {
            let _ = writeln!(out, "   {cap}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::StaticRegistry;
    use crate::builder::{ProcessRole, SchemaBuilder};
    use crate::directive::lower_script;
    use crate::parser::parse_script;
    use std::sync::Arc;

    fn build(kind: PluginKind, src: &str) -> PluginDescriptor {
        let script = parse_script(src).unwrap();
        let directives = lower_script(&script).unwrap();
        let mut builder = SchemaBuilder::new(
            "test",
            kind,
            ProcessRole::Client,
            Arc::new(StaticRegistry::stock()),
        );
        builder.apply_all(&directives).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_agent_help_lists_actions_and_inputs() {
        let ddl = build(
            PluginKind::Agent,
            r#"
            (metadata :name "service" :description "Service agent"
                      :author "R.I. Pienaar" :license "ASL-2.0" :version "4.1"
                      :url "https://example.net" :timeout 60)
            (action "status" :description "Gets the status"
              (input "service" :prompt "Service Name" :description "The service"
                     :type "string" :optional false :validation "^\\w+$" :maxlength 30)
              (output "status" :description "The status" :display-as "Status" :default "unknown"))
            "#,
        );

        let help = render(&ddl);
        assert!(help.starts_with("service\n=======\n"));
        assert!(help.contains("Author: R.I. Pienaar"));
        assert!(help.contains("status action:"));
        assert!(help.contains("Prompt: Service Name"));
        assert!(help.contains("Max Length: 30"));
        assert!(help.contains("Display As: Status"));
        assert!(help.contains("Default: \"unknown\""));
    }

    #[test]
    fn test_discovery_help_lists_capabilities() {
        let ddl = build(
            PluginKind::Discovery,
            r#"
            (metadata :name "mc" :description "d" :author "a" :license "l"
                      :version "1" :url "u" :timeout 2)
            (discovery (capabilities ["classes" "facts"]))
            "#,
        );

        let help = render(&ddl);
        assert!(help.contains("DISCOVERY CAPABILITIES:"));
        assert!(help.contains("   classes\n"));
        assert!(help.contains("   facts\n"));
    }
}
