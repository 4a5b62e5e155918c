//! Render the help text for a plugin DDL.
//!
//! Usage:
//!   ddl-doc <file.ddl> [kind]          render one DDL file (kind defaults to agent)
//!   ddl-doc <kind> <plugin>            search DDL_PATH for <kind>/<plugin>.ddl

use std::path::Path;

use anyhow::{bail, Context, Result};
use ddl_core::{help, DdlLoader, PluginKind, ProcessRole};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let ddl = match args.as_slice() {
        [path] if path.ends_with(".ddl") => load_file(path, PluginKind::Agent)?,
        [path, kind] if path.ends_with(".ddl") => load_file(path, kind.parse()?)?,
        [kind, plugin] => {
            let kind: PluginKind = kind.parse()?;
            DdlLoader::from_env(ProcessRole::Client)
                .load(plugin, kind)
                .with_context(|| format!("loading {kind} plugin '{plugin}'"))?
        }
        _ => bail!("usage: ddl-doc <file.ddl> [kind] | ddl-doc <kind> <plugin>"),
    };

    print!("{}", help::render(&ddl));
    Ok(())
}

fn load_file(path: &str, kind: PluginKind) -> Result<ddl_core::PluginDescriptor> {
    let path = Path::new(path);
    let plugin = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("DDL path has no file name")?;
    let source =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let loader = DdlLoader::new(Vec::new(), ProcessRole::Client);
    Ok(loader.load_str(plugin, kind, &source)?)
}
