//! Route export classification.
//!
//! Export names are read from route source with oxc and bucketed into
//! server-only and client-safe sets. The [`ModuleIntrospector`] trait is the
//! seam between the synthesizers and whatever reads the modules.

pub mod introspect;
pub mod lexer;
pub mod policy;
pub mod strip;

use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

pub use introspect::OxcIntrospector;

/// Exports removed from route modules in the client build.
pub const SERVER_ONLY_ROUTE_EXPORTS: &[&str] = &["loader", "action", "headers"];

/// Exports a client route module may re-export.
pub const CLIENT_ROUTE_EXPORTS: &[&str] = &[
    "clientAction",
    "clientLoader",
    "default",
    "ErrorBoundary",
    "handle",
    "HydrateFallback",
    "links",
    "meta",
    "shouldRevalidate",
];

/// Fallback component export, only allowed on the root route in SPA mode.
pub const HYDRATE_FALLBACK_EXPORT: &str = "HydrateFallback";

/// Export names per route id, in route manifest order.
pub type RouteExportSet = IndexMap<String, Vec<String>>;

/// Reads the exported names of a module.
///
/// Implementations are created once per build or dev session and closed when
/// it ends. They must not be shared between sessions.
#[async_trait]
pub trait ModuleIntrospector: Send + Sync {
    /// Exported names of the module at `path`, in source order.
    async fn exports(&self, path: &Path) -> Result<Vec<String>>;

    /// End the session. Later calls to `exports` fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Introspector serving canned export lists.
#[derive(Debug, Default)]
pub struct StaticIntrospector {
    exports: RwLock<FxHashMap<PathBuf, Vec<String>>>,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exports(self, path: impl AsRef<Path>, names: &[&str]) -> Self {
        self.set_exports(path, names);
        self
    }

    /// Replace the export list for `path`.
    pub fn set_exports(&self, path: impl AsRef<Path>, names: &[&str]) {
        self.exports.write().insert(
            path.as_ref().clean(),
            names.iter().map(|name| name.to_string()).collect(),
        );
    }
}

#[async_trait]
impl ModuleIntrospector for StaticIntrospector {
    async fn exports(&self, path: &Path) -> Result<Vec<String>> {
        self.exports
            .read()
            .get(&path.clean())
            .cloned()
            .ok_or_else(|| Error::UnresolvableModule(path.to_path_buf()))
    }
}

/// Capability flags derived from a route's exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteCapabilities {
    pub has_loader: bool,
    pub has_action: bool,
    pub has_client_loader: bool,
    pub has_client_action: bool,
    pub has_error_boundary: bool,
}

impl RouteCapabilities {
    pub fn from_exports(exports: &[String]) -> Self {
        let has = |name: &str| exports.iter().any(|export| export == name);
        Self {
            has_loader: has("loader"),
            has_action: has("action"),
            has_client_loader: has("clientLoader"),
            has_client_action: has("clientAction"),
            has_error_boundary: has("ErrorBoundary"),
        }
    }
}

/// Exports of `exports` found in `list`, keeping the module's order.
pub fn exports_in<'a>(exports: &'a [String], list: &[&str]) -> Vec<&'a str> {
    exports
        .iter()
        .map(String::as_str)
        .filter(|name| list.contains(name))
        .collect()
}
