//! DDL loader: locate, parse, and build plugin descriptors.
//!
//! All configuration is explicit: the library search path, the process
//! role, and the aggregate registry are handed in at construction. The
//! `from_env` constructor only reads `DDL_PATH` as a convenience; there
//! is no global lookup behind the loader's back.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::{AggregateRegistry, StaticRegistry};
use crate::builder::{ProcessRole, SchemaBuilder};
use crate::descriptor::{PluginDescriptor, PluginKind, SchemaError};
use crate::directive::lower_script;
use crate::parser::parse_script;

/// Environment variable holding the library search path, `PATH`-style.
pub const DDL_PATH_ENV: &str = "DDL_PATH";

/// Why a load failed.
///
/// `DescriptorNotFound` is a distinct, caller-retryable condition; parse
/// and schema failures are fatal to the plugin until its DDL is fixed.
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("no DDL found for {kind} plugin '{plugin}' on the library path")]
    DescriptorNotFound { plugin: String, kind: PluginKind },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse DDL for plugin '{plugin}':\n{message}")]
    Parse { plugin: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Loads plugin descriptors from `.ddl` files on a library search path.
pub struct DdlLoader {
    libdirs: Vec<PathBuf>,
    role: ProcessRole,
    registry: Arc<dyn AggregateRegistry>,
}

impl DdlLoader {
    /// Loader over an explicit, ordered list of library directories,
    /// using the stock aggregate registry.
    pub fn new(libdirs: Vec<PathBuf>, role: ProcessRole) -> Self {
        Self {
            libdirs,
            role,
            registry: Arc::new(StaticRegistry::stock()),
        }
    }

    /// Replace the aggregate-function registry.
    pub fn with_registry(mut self, registry: Arc<dyn AggregateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Loader configured from the `DDL_PATH` environment variable.
    pub fn from_env(role: ProcessRole) -> Self {
        let libdirs = match std::env::var_os(DDL_PATH_ENV) {
            Some(val) => std::env::split_paths(&val).collect(),
            None => Vec::new(),
        };
        Self::new(libdirs, role)
    }

    pub fn libdirs(&self) -> &[PathBuf] {
        &self.libdirs
    }

    /// Resolve the DDL file for a plugin: first match on the search path.
    pub fn find_ddl(&self, plugin: &str, kind: PluginKind) -> Option<PathBuf> {
        for dir in &self.libdirs {
            let candidate = dir.join(kind.dir_name()).join(format!("{plugin}.ddl"));
            debug!(path = %candidate.display(), "probing for DDL");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Load and build the descriptor for one plugin.
    pub fn load(&self, plugin: &str, kind: PluginKind) -> Result<PluginDescriptor, DdlError> {
        let path = self
            .find_ddl(plugin, kind)
            .ok_or_else(|| DdlError::DescriptorNotFound {
                plugin: plugin.to_string(),
                kind,
            })?;

        let source = std::fs::read_to_string(&path).map_err(|source| DdlError::Io {
            path: path.clone(),
            source,
        })?;

        let descriptor = self.load_str(plugin, kind, &source)?;
        info!(plugin, %kind, path = %path.display(), "loaded plugin DDL");
        Ok(descriptor)
    }

    /// Build a descriptor from in-memory DDL source (for embedding and
    /// tests). Parse and schema failures abort the whole load; there is
    /// no partially valid descriptor.
    pub fn load_str(
        &self,
        plugin: &str,
        kind: PluginKind,
        source: &str,
    ) -> Result<PluginDescriptor, DdlError> {
        let script = parse_script(source).map_err(|message| DdlError::Parse {
            plugin: plugin.to_string(),
            message,
        })?;
        let directives = lower_script(&script)?;

        let mut builder =
            SchemaBuilder::new(plugin, kind, self.role, Arc::clone(&self.registry));
        builder.apply_all(&directives)?;
        Ok(builder.finish()?)
    }
}
